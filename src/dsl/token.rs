//! Token types for the OpenDec lexer.

use std::fmt;

use super::cursor::Position;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

/// The kind of token, with its literal value where it has one.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),

    // Special characters
    Comma,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LChevron,
    RChevron,

    Eof,
}

impl TokenKind {
    /// Token kind for one of the special characters `, { } [ ] < >`.
    pub fn special(ch: char) -> Option<Self> {
        let kind = match ch {
            ',' => TokenKind::Comma,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '<' => TokenKind::LChevron,
            '>' => TokenKind::RChevron,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(v) => write!(f, "INT '{v}'"),
            TokenKind::Float(v) => write!(f, "FLOAT '{v}'"),
            TokenKind::Str(s) => write!(f, "STRING '{s}'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::LBrace => f.write_str("'{'"),
            TokenKind::RBrace => f.write_str("'}'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::LChevron => f.write_str("'<'"),
            TokenKind::RChevron => f.write_str("'>'"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}
