//! Parser for OpenDec.
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! Program    := (Command | Phoneme)* EOF
//! Command    := '[' ':' NAME Param* ']' ('{' (Command | Phoneme)* '}')?
//! Voice      := '[' ':voice' NAME ']' ('{' VoiceParam (','? VoiceParam)* '}')?
//! VoiceParam := NAME INT
//! Phoneme    := (NAME | ',') ('<' Duration? (',' INT?)? '>')?
//! ```

use tracing::{debug, info};

use super::ast::*;
use super::cursor::Position;
use super::error::CompileError;
use super::phonemes::{has_no_length, has_no_pitch};
use super::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parser over `tokens`. An end-of-input token is appended when the
    /// stream does not already end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let pos = tokens.last().map(|t| t.pos.clone()).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                pos,
            });
        }
        Self { tokens, pos: 0 }
    }

    /// Parse every node up to and including the terminating [`Node::End`].
    pub fn parse(&mut self) -> Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();

        loop {
            let node = match &self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::LBracket => self.parse_command()?,
                TokenKind::Comma | TokenKind::Str(_) => self.parse_phoneme()?,
                other => {
                    return Err(CompileError::syntax(
                        format!("unexpected {other}"),
                        &self.peek().pos,
                    ));
                }
            };
            debug!("parser: read node {node}");
            nodes.push(node);
        }

        nodes.push(Node::End(self.peek().pos.clone()));
        info!("parser: read {} nodes", nodes.len());
        Ok(nodes)
    }

    fn parse_command(&mut self) -> Result<Node, CompileError> {
        let pos = self.peek().pos.clone();
        self.advance(); // consume '['

        let name = match &self.peek().kind {
            TokenKind::Str(s) => s.clone(),
            other => {
                return Err(CompileError::syntax(
                    format!("expected STRING for command name, got {other}"),
                    &pos,
                ));
            }
        };
        let Some(bare) = name.strip_prefix(':') else {
            return Err(CompileError::syntax(
                format!("command '{name}' must start with ':' - try ':{name}'"),
                &pos,
            ));
        };
        if bare.is_empty() {
            return Err(CompileError::syntax(
                "no command provided - only got ':'",
                &pos,
            ));
        }
        self.advance();

        if bare == "voice" {
            return self.parse_voice(pos);
        }

        let mut command = Command::new(pos, bare);

        loop {
            let param = match &self.peek().kind {
                TokenKind::RBracket => break,
                TokenKind::Int(v) => Param::Int(*v),
                TokenKind::Float(v) => Param::Float(*v),
                TokenKind::Str(s) => Param::Str(s.clone()),
                TokenKind::Eof => {
                    return Err(CompileError::syntax(
                        format!("command ':{}' is never closed with ']'", command.name),
                        &command.pos,
                    ));
                }
                other => {
                    return Err(CompileError::syntax(
                        format!("command parameter can only be STRING, INT or FLOAT - got {other}"),
                        &command.pos,
                    ));
                }
            };
            command.params.push(param);
            self.advance();
        }
        self.advance(); // consume ']'

        if self.check(&TokenKind::LBrace) {
            self.advance();
            command.context = self.parse_context(&command.pos)?;
        }

        Ok(Node::Command(command))
    }

    /// Parse the nodes of a `{ ... }` block; the opening brace is consumed.
    fn parse_context(&mut self, owner: &Position) -> Result<Vec<Node>, CompileError> {
        let mut context = Vec::new();

        loop {
            let node = match &self.peek().kind {
                TokenKind::RBrace => break,
                TokenKind::LBracket => self.parse_command()?,
                TokenKind::Comma | TokenKind::Str(_) => self.parse_phoneme()?,
                TokenKind::Eof => {
                    return Err(CompileError::syntax(
                        "command context is never closed with '}'",
                        owner,
                    ));
                }
                other => {
                    return Err(CompileError::syntax(
                        format!("illegal {other} in command context"),
                        owner,
                    ));
                }
            };
            context.push(node);
        }
        self.advance(); // consume '}'

        Ok(context)
    }

    fn parse_phoneme(&mut self) -> Result<Node, CompileError> {
        let token = self.peek();
        let pos = token.pos.clone();
        let symbol = match &token.kind {
            TokenKind::Str(s) => s.clone(),
            TokenKind::Comma => ",".to_string(),
            other => {
                return Err(CompileError::syntax(
                    format!("expected phoneme, got {other}"),
                    &pos,
                ));
            }
        };
        self.advance();

        let mut phoneme = Phoneme::new(pos, symbol);

        if self.check(&TokenKind::LChevron) {
            self.advance();

            match self.peek().kind {
                TokenKind::Int(v) => {
                    phoneme.duration = Duration::Int(v);
                    self.advance();
                }
                TokenKind::Float(v) => {
                    phoneme.duration = Duration::Float(v);
                    self.advance();
                }
                _ => {}
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
                if let TokenKind::Int(v) = self.peek().kind {
                    phoneme.pitch = v;
                    self.advance();
                }
            }

            if !self.check(&TokenKind::RChevron) {
                return Err(CompileError::syntax(
                    format!(
                        "missing '>' when parsing phoneme '{}' - got {}",
                        phoneme.symbol,
                        self.peek().kind
                    ),
                    &phoneme.pos,
                ));
            }
            self.advance();
        }

        if has_no_length(&phoneme.symbol) {
            phoneme.duration = Duration::Int(0);
        }
        if has_no_pitch(&phoneme.symbol) {
            phoneme.pitch = 0;
        }

        Ok(Node::Phoneme(phoneme))
    }

    /// `[:voice` has been consumed; parse the name and optional parameter block.
    fn parse_voice(&mut self, pos: Position) -> Result<Node, CompileError> {
        let name = match &self.peek().kind {
            TokenKind::Str(s) => s.clone(),
            other => {
                return Err(CompileError::syntax(
                    format!("voice name must be STRING - got {other}"),
                    &pos,
                ));
            }
        };
        self.advance();

        if !self.check(&TokenKind::RBracket) {
            return Err(CompileError::syntax(
                format!(
                    "voice command takes only one parameter - got {}",
                    self.peek().kind
                ),
                &pos,
            ));
        }
        self.advance();

        let mut voice = Voice {
            pos,
            name,
            params: VoiceParams::new(),
        };

        if !self.check(&TokenKind::LBrace) {
            return Ok(Node::Voice(voice));
        }
        self.advance();

        if self.check(&TokenKind::RBrace) {
            return Err(CompileError::syntax(
                format!("voice '{}' has an empty parameter block", voice.name),
                &voice.pos,
            ));
        }

        loop {
            let key = match &self.peek().kind {
                TokenKind::RBrace => break,
                TokenKind::Str(s) => s.clone(),
                TokenKind::Eof => {
                    return Err(CompileError::syntax(
                        format!("voice '{}' is never closed with '}}'", voice.name),
                        &voice.pos,
                    ));
                }
                other => {
                    return Err(CompileError::syntax(
                        format!("voice parameter must be STRING - got {other}"),
                        &voice.pos,
                    ));
                }
            };
            self.advance();

            let TokenKind::Int(value) = self.peek().kind else {
                return Err(CompileError::syntax(
                    format!(
                        "voice parameter '{key}' value must be INT - got {}",
                        self.peek().kind
                    ),
                    &voice.pos,
                ));
            };
            self.advance();

            if voice.params.insert(key.clone(), value).is_some() {
                return Err(CompileError::syntax(
                    format!("voice '{}' sets parameter '{key}' twice", voice.name),
                    &voice.pos,
                ));
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.advance(); // consume '}'

        Ok(Node::Voice(voice))
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::error::ErrorKind;
    use crate::dsl::lexer::Lexer;

    fn parse(src: &str) -> Result<Vec<Node>, CompileError> {
        let tokens = Lexer::new(src).tokenize()?;
        Parser::new(tokens).parse()
    }

    fn phoneme(symbol: &str, duration: Duration, pitch: i64) -> Node {
        Node::Phoneme(Phoneme {
            pos: Position::default(),
            symbol: symbol.to_string(),
            duration,
            pitch,
        })
    }

    fn command(name: &str, params: Vec<Param>, context: Vec<Node>) -> Node {
        Node::Command(Command {
            pos: Position::default(),
            name: name.to_string(),
            params,
            context,
        })
    }

    fn end() -> Node {
        Node::End(Position::default())
    }

    #[test]
    fn parse_empty_program() {
        assert_eq!(parse("").unwrap(), vec![end()]);
    }

    #[test]
    fn parse_without_eof_token() {
        assert_eq!(Parser::new(Vec::new()).parse().unwrap(), vec![end()]);

        let mut tokens = Lexer::new("aa<5>").tokenize().unwrap();
        tokens.pop();
        assert_eq!(
            Parser::new(tokens).parse().unwrap(),
            vec![phoneme("aa", Duration::Int(5), 0), end()]
        );

        let mut tokens = Lexer::new("[:cp 5").tokenize().unwrap();
        tokens.pop();
        assert_eq!(Parser::new(tokens).parse().unwrap_err().kind, ErrorKind::Syntax);
    }

    #[test]
    fn parse_phonemes() {
        let nodes = parse("p1 p2<10,10> aa<0.5> aa<,7> aa<3,> aa<>").unwrap();
        assert_eq!(
            nodes,
            vec![
                phoneme("p1", Duration::Int(0), 0),
                phoneme("p2", Duration::Int(10), 10),
                phoneme("aa", Duration::Float(0.5), 0),
                phoneme("aa", Duration::Int(0), 7),
                phoneme("aa", Duration::Int(3), 0),
                phoneme("aa", Duration::Int(0), 0),
                end(),
            ]
        );
    }

    #[test]
    fn parse_special_phoneme_rules() {
        let nodes = parse(",<500,10> b<100,10> _<100,10> '<5>").unwrap();
        assert_eq!(
            nodes,
            vec![
                phoneme(",", Duration::Int(0), 0),
                phoneme("b", Duration::Int(100), 0),
                phoneme("_", Duration::Int(100), 0),
                phoneme("'", Duration::Int(0), 0),
                end(),
            ]
        );
    }

    #[test]
    fn parse_command_with_params() {
        let nodes = parse("[:tone 100 1000] [:volume sset 50 50] [:x 1.5]").unwrap();
        assert_eq!(
            nodes,
            vec![
                command("tone", vec![Param::Int(100), Param::Int(1000)], vec![]),
                command(
                    "volume",
                    vec![Param::Str("sset".into()), Param::Int(50), Param::Int(50)],
                    vec![]
                ),
                command("x", vec![Param::Float(1.5)], vec![]),
                end(),
            ]
        );
    }

    #[test]
    fn parse_command_with_context() {
        let nodes = parse("[:loop 2] { aa [:cp 5] , [:phrase p] { b } }").unwrap();
        assert_eq!(
            nodes[0],
            command(
                "loop",
                vec![Param::Int(2)],
                vec![
                    phoneme("aa", Duration::Int(0), 0),
                    command("cp", vec![Param::Int(5)], vec![]),
                    phoneme(",", Duration::Int(0), 0),
                    command(
                        "phrase",
                        vec![Param::Str("p".into())],
                        vec![phoneme("b", Duration::Int(0), 0)]
                    ),
                ]
            )
        );
    }

    #[test]
    fn parse_voice() {
        let nodes = parse("[:voice robot] { sx 0 hs 110, f4 3000 } [:voice plain]").unwrap();
        let Node::Voice(voice) = &nodes[0] else {
            panic!("expected voice, got {:?}", nodes[0]);
        };
        assert_eq!(voice.name, "robot");
        assert_eq!(voice.params.len(), 3);
        assert_eq!(voice.params["hs"], 110);
        let Node::Voice(plain) = &nodes[1] else {
            panic!("expected voice, got {:?}", nodes[1]);
        };
        assert!(plain.params.is_empty());
    }

    #[test]
    fn voice_inside_context_is_still_a_voice() {
        let nodes = parse("[:loop 1] { [:voice v] }").unwrap();
        let Node::Command(cmd) = &nodes[0] else {
            panic!("expected command");
        };
        assert!(matches!(cmd.context[0], Node::Voice(_)));
    }

    #[test]
    fn round_trip_reencoding() {
        let src = "aa<5,10> b<0.25> [:loop 3] { aa<,4> [:cp 50] } [:x 2.0 y] \
                   [:voice v] { sx 0, hs 110 } [:voice w] , _<1>";
        let nodes = parse(src).unwrap();
        for node in &nodes {
            let text = node.to_string();
            if text.is_empty() {
                continue;
            }
            let reparsed = parse(&text).unwrap();
            assert_eq!(reparsed.len(), 2, "re-encoded {text:?}");
            assert_eq!(&reparsed[0], node, "re-encoded {text:?}");
        }
    }

    #[test]
    fn positions_point_at_construct_start() {
        let nodes = parse("aa\n  [:cp 5]").unwrap();
        assert_eq!(nodes[1].pos().line, 1);
        assert_eq!(nodes[1].pos().column, 2);
    }

    #[test]
    fn error_top_level_int() {
        let err = parse("aa 50").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.pos.column, 3);
    }

    #[test]
    fn error_bad_command_names() {
        for src in ["[]", "[5]", "[cp 5]", "[: 5]", "[:]"] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "source {src:?}");
        }
    }

    #[test]
    fn error_unclosed_constructs() {
        for src in [
            "[:cp 5",
            "[:loop 2] { aa",
            "aa<5",
            "aa<5,6,",
            "[:voice v",
            "[:voice v] { sx 0",
            "[:cp {]",
        ] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "source {src:?}");
        }
    }

    #[test]
    fn error_reports_command_position() {
        let err = parse("aa [:loop 1] { aa > }").unwrap_err();
        assert_eq!(err.pos.column, 3);
        assert!(err.message.contains("'>'"), "{}", err.message);
    }

    #[test]
    fn error_voice_shapes() {
        for src in [
            "[:voice 5]",
            "[:voice v extra]",
            "[:voice v] { 5 5 }",
            "[:voice v] { sx x }",
            "[:voice v] { sx 1.5 }",
            "[:voice v] { sx 0 sx 1 }",
            "[:voice v] { }",
        ] {
            assert!(parse(src).is_err(), "source {src:?}");
        }
    }
}
