//! Error types for the OpenDec compiler.

use std::fmt;
use std::io;

use super::cursor::Position;

/// An error that occurred while compiling OpenDec source.
///
/// Every error is fatal: the first one aborts the whole compilation,
/// including any imports still in progress.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{pos}] {kind}: {message}")]
pub struct CompileError {
    pub message: String,
    pub pos: Position,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Illegal character, unterminated block comment, malformed number.
    Lex,
    /// Unexpected or missing token, unclosed construct.
    Syntax,
    /// Wrong parameter count/type/keyword/range, malformed sound.
    Validation,
    /// Name collision between phrases, sounds, voices and phonemes.
    Registration,
    /// Unknown phoneme reference, missing import/play file.
    Resolution,
    /// Sound too short for its consonants.
    Runtime,
    /// Reading an imported file or writing output failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lex => "LexError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Registration => "RegistrationError",
            ErrorKind::Resolution => "ResolutionError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pos: &Position) -> Self {
        Self {
            message: message.into(),
            pos: pos.clone(),
            kind,
        }
    }

    pub fn lex(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Lex, message, pos)
    }

    pub fn syntax(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Syntax, message, pos)
    }

    pub fn validation(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Validation, message, pos)
    }

    pub fn registration(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Registration, message, pos)
    }

    pub fn resolution(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Resolution, message, pos)
    }

    pub fn runtime(message: impl Into<String>, pos: &Position) -> Self {
        Self::new(ErrorKind::Runtime, message, pos)
    }

    pub fn io(err: &io::Error, context: impl fmt::Display, pos: &Position) -> Self {
        Self::new(ErrorKind::Io, format!("{context}: {err}"), pos)
    }
}
