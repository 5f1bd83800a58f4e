//! Source text and the read cursor the lexer walks over it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A location in a source buffer.
///
/// Index, line and column are 0-based. Positions are plain values: the
/// cursor hands out clones, so advancing it never changes a position that
/// was already attached to a token, node or error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    /// File the text came from; empty for in-memory text.
    pub file: Arc<str>,
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start(file: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.into(),
            index: 0,
            line: 0,
            column: 0,
        }
    }

    fn advance(&mut self, ch: char) {
        self.index += 1;
        self.column += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() {
            "<text>"
        } else {
            &self.file
        };
        write!(f, "{}:{}:{}", file, self.line + 1, self.column + 1)
    }
}

/// Source text to compile, optionally backed by a file.
#[derive(Debug, Clone)]
pub struct Source {
    pub text: String,
    pub path: Option<PathBuf>,
}

impl Source {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            text,
            path: Some(path.to_path_buf()),
        })
    }

    /// File identifier used in positions; empty for in-memory text.
    pub fn file_id(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    /// Directory relative imports are resolved against, if the source is a file.
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}

/// Character cursor over a source buffer.
pub struct Cursor {
    chars: Vec<char>,
    pos: Position,
}

impl Cursor {
    pub fn new(text: &str, file: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: Position::start(file),
        }
    }

    /// Character under the cursor, `None` at end of input.
    pub fn current(&self) -> Option<char> {
        self.chars.get(self.pos.index).copied()
    }

    pub fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos.index + 1).copied()
    }

    pub fn advance(&mut self) {
        if let Some(ch) = self.current() {
            self.pos.advance(ch);
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos.index >= self.chars.len()
    }

    /// Snapshot of the current position.
    pub fn position(&self) -> Position {
        self.pos.clone()
    }
}
