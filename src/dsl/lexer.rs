//! Lexer for OpenDec source.
//!
//! Converts source text into a stream of [`Token`]s, dropping whitespace
//! and comments. Anything that is not a number, a special character or a
//! comment is a string token, so phoneme names, command names and file
//! paths all come out as [`TokenKind::Str`].

use tracing::{debug, info};

use super::cursor::Cursor;
use super::error::CompileError;
use super::token::{Token, TokenKind};

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

/// Characters that end a number or string token.
fn is_break(ch: char) -> bool {
    is_whitespace(ch) || ch == '/' || TokenKind::special(ch).is_some()
}

pub struct Lexer {
    cursor: Cursor,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_file(source, "")
    }

    /// Lexer whose token positions name `file`.
    pub fn with_file(source: &str, file: &str) -> Self {
        Self {
            cursor: Cursor::new(source, file),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.cursor.current() {
            if is_whitespace(ch) {
                self.cursor.advance();
                continue;
            }

            let token = if ch == '/' {
                match self.scan_comment()? {
                    Some(token) => token,
                    None => continue,
                }
            } else if let Some(kind) = TokenKind::special(ch) {
                let pos = self.cursor.position();
                self.cursor.advance();
                Token { kind, pos }
            } else if ch.is_ascii_digit() {
                self.scan_number()?
            } else {
                self.scan_string()?
            };

            debug!("lexer: read {} at {}", token.kind, token.pos);
            tokens.push(token);
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            pos: self.cursor.position(),
        });
        info!("lexer: read {} tokens", tokens.len());
        Ok(tokens)
    }

    /// Read up to the next break character. A `/` that does not open a
    /// comment is kept, together with whatever follows it.
    fn read_remaining(&mut self) -> Result<String, CompileError> {
        let mut text = String::new();
        while let Some(ch) = self.cursor.current() {
            if is_break(ch) {
                break;
            }
            text.push(ch);
            self.cursor.advance();
        }

        if self.cursor.current() == Some('/') {
            if let Some(Token {
                kind: TokenKind::Str(rest),
                ..
            }) = self.scan_comment()?
            {
                text.push_str(&rest);
            }
        }
        Ok(text)
    }

    /// Skip a comment starting at the current `/`. Returns a string token
    /// instead when the `/` turns out not to open a comment.
    fn scan_comment(&mut self) -> Result<Option<Token>, CompileError> {
        let pos = self.cursor.position();
        self.cursor.advance(); // consume '/'

        match self.cursor.current() {
            Some('/') => {
                while let Some(ch) = self.cursor.current() {
                    if ch == '\n' {
                        break;
                    }
                    self.cursor.advance();
                }
                Ok(None)
            }
            Some('*') => {
                self.cursor.advance();
                loop {
                    match self.cursor.current() {
                        None => {
                            return Err(CompileError::lex(
                                "block comment is never closed",
                                &pos,
                            ));
                        }
                        Some('*') if self.cursor.peek_next() == Some('/') => {
                            self.cursor.advance();
                            self.cursor.advance();
                            return Ok(None);
                        }
                        Some(_) => self.cursor.advance(),
                    }
                }
            }
            _ => {
                let rest = self.read_remaining()?;
                Ok(Some(Token {
                    kind: TokenKind::Str(format!("/{rest}")),
                    pos,
                }))
            }
        }
    }

    fn scan_number(&mut self) -> Result<Token, CompileError> {
        let pos = self.cursor.position();
        let mut literal = String::new();
        let mut is_float = false;

        while let Some(ch) = self.cursor.current() {
            if is_break(ch) {
                break;
            }

            if ch.is_ascii_digit() {
                literal.push(ch);
            } else if ch == '.' && !is_float {
                literal.push(ch);
                is_float = true;
            } else if ch == '.' {
                literal.push_str(&self.read_remaining()?);
                return Err(CompileError::lex(
                    format!("invalid FLOAT '{literal}' - can only have a single '.'"),
                    &pos,
                ));
            } else {
                let number_kind = if is_float { "FLOAT" } else { "INT" };
                literal.push_str(&self.read_remaining()?);
                return Err(CompileError::lex(
                    format!(
                        "invalid {number_kind} '{literal}' - '{ch}' is not a legal number character"
                    ),
                    &pos,
                ));
            }
            self.cursor.advance();
        }

        let kind = if is_float {
            let val: f64 = literal.parse().map_err(|_| {
                CompileError::lex(format!("invalid FLOAT '{literal}'"), &pos)
            })?;
            TokenKind::Float(val)
        } else {
            let val: i64 = literal.parse().map_err(|_| {
                CompileError::lex(format!("INT '{literal}' is out of range"), &pos)
            })?;
            TokenKind::Int(val)
        };

        Ok(Token { kind, pos })
    }

    fn scan_string(&mut self) -> Result<Token, CompileError> {
        let pos = self.cursor.position();
        let text = self.read_remaining()?;
        Ok(Token {
            kind: TokenKind::Str(text),
            pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::error::ErrorKind;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn str_kind(s: &str) -> TokenKind {
        TokenKind::Str(s.to_string())
    }

    #[test]
    fn lex_command() {
        assert_eq!(
            kinds("[:comma 50]"),
            vec![
                TokenKind::LBracket,
                str_kind(":comma"),
                TokenKind::Int(50),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_phoneme_with_length_and_pitch() {
        assert_eq!(
            kinds("aa<5.5,10>"),
            vec![
                str_kind("aa"),
                TokenKind::LChevron,
                TokenKind::Float(5.5),
                TokenKind::Comma,
                TokenKind::Int(10),
                TokenKind::RChevron,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_all_special_characters() {
        assert_eq!(
            kinds(",{}[]<>"),
            vec![
                TokenKind::Comma,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LChevron,
                TokenKind::RChevron,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_leading_zeros() {
        assert_eq!(kinds("007")[0], TokenKind::Int(7));
        assert_eq!(kinds("00.50")[0], TokenKind::Float(0.5));
        assert_eq!(kinds("5.")[0], TokenKind::Float(5.0));
    }

    #[test]
    fn lex_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds(" \t\r\n "), vec![TokenKind::Eof]);
    }

    #[test]
    fn lex_comment_only_sources() {
        for src in [
            "// line",
            "/* block */",
            "/**/",
            "/***/",
            "// a\n/* b\n c */ // d",
            "/* a */// b",
        ] {
            assert_eq!(kinds(src), vec![TokenKind::Eof], "source {src:?}");
        }
    }

    #[test]
    fn lex_comments_end_tokens() {
        assert_eq!(
            kinds("aa// note\nb /* x */ ch"),
            vec![str_kind("aa"), str_kind("b"), str_kind("ch"), TokenKind::Eof]
        );
        assert_eq!(kinds("12// n")[0], TokenKind::Int(12));
    }

    #[test]
    fn lex_unterminated_block_comment() {
        let err = Lexer::new("aa\n  /* never closed").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert_eq!((err.pos.line, err.pos.column), (1, 2));
    }

    #[test]
    fn lex_paths_as_strings() {
        assert_eq!(kinds("/home/user/file.ext")[0], str_kind("/home/user/file.ext"));
        assert_eq!(kinds("lib/a.opendec")[0], str_kind("lib/a.opendec"));
        assert_eq!(
            kinds("[:play /tmp/a.wav]"),
            vec![
                TokenKind::LBracket,
                str_kind(":play"),
                str_kind("/tmp/a.wav"),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_lone_slash_is_a_string() {
        assert_eq!(kinds("/ aa"), vec![str_kind("/"), str_kind("aa"), TokenKind::Eof]);
    }

    #[test]
    fn lex_strings_are_verbatim() {
        assert_eq!(kinds("\"hi\"")[0], str_kind("\"hi\""));
        assert_eq!(kinds("' ` .")[..3], [str_kind("'"), str_kind("`"), str_kind(".")]);
    }

    #[test]
    fn lex_double_dot_float_error() {
        let err = Lexer::new("1.2.3").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert!(err.message.contains("'1.2.3'"), "{}", err.message);
    }

    #[test]
    fn lex_illegal_number_character() {
        let err = Lexer::new("  12ab x").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert!(err.message.contains("'12ab'"), "{}", err.message);
        assert!(err.message.contains("'a'"), "{}", err.message);
        assert_eq!(err.pos.column, 2);
    }

    #[test]
    fn lex_integer_overflow() {
        let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
    }

    #[test]
    fn lex_line_tracking() {
        let tokens = Lexer::with_file("aa\n  [:cp 5]", "song.opendec")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].pos.line, 0);
        assert_eq!((tokens[1].pos.line, tokens[1].pos.column), (1, 2));
        assert_eq!(&*tokens[1].pos.file, "song.opendec");
        assert_eq!(tokens[1].pos.index, 5);
    }
}
