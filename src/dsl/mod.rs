//! OpenDec compiler: source text → tokens → nodes → engine instruction stream.

pub mod ast;
pub mod cursor;
pub mod error;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod phonemes;
pub mod process;
pub mod state;
pub mod token;
pub mod validate;

pub use ast::{Command, Duration, Node, Param, Phoneme, Voice, VoiceParams};
pub use cursor::{Position, Source};
pub use error::{CompileError, ErrorKind};
pub use output::{FileSink, FileSystem, OsFileSystem, Sink};
pub use process::{Behavior, Processor};
pub use state::State;
pub use validate::CommandKind;

use std::path::PathBuf;

use lexer::Lexer;
use parser::Parser;
use token::Token;

/// The OpenDec compiler.
///
/// Runs source text through lexer → parser → processor, writing the
/// engine's instruction stream to a [`Sink`].
pub struct Compiler;

impl Compiler {
    /// Lex source text into tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
        Lexer::new(source).tokenize()
    }

    /// Parse source text into nodes, ending with [`Node::End`].
    pub fn parse(source: &str) -> Result<Vec<Node>, CompileError> {
        let tokens = Self::tokenize(source)?;
        Parser::new(tokens).parse()
    }

    /// Compile in-memory text with a fresh state and return the output.
    pub fn compile(source: &str, includes: Vec<PathBuf>) -> Result<String, CompileError> {
        let mut state = State::new(includes);
        let mut out = String::new();
        Self::compile_source(&Source::from_text(source), &mut state, &mut out)?;
        Ok(out)
    }

    /// Compile a source against the real filesystem.
    pub fn compile_source(
        source: &Source,
        state: &mut State,
        sink: &mut dyn Sink,
    ) -> Result<(), CompileError> {
        Self::compile_with(source, state, sink, &OsFileSystem)
    }

    /// Compile a source, reading imports through `fs`.
    pub fn compile_with(
        source: &Source,
        state: &mut State,
        sink: &mut dyn Sink,
        fs: &dyn FileSystem,
    ) -> Result<(), CompileError> {
        let tokens = Lexer::with_file(&source.text, &source.file_id()).tokenize()?;
        let nodes = Parser::new(tokens).parse()?;

        let mut processor = Processor::new(state, sink, fs);
        if let Some(path) = &source.path {
            processor = processor.for_file(path);
        }
        processor.process(&nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ends_with_end_node() {
        let nodes = Compiler::parse("aa [:cp 5]").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes.last(), Some(Node::End(_))));
    }

    #[test]
    fn compile_text() {
        let out = Compiler::compile("[:bpm 60] _<1> [:cp 5]", Vec::new()).unwrap();
        assert_eq!(out, "[_<1000>][:cp 5]");
    }

    #[test]
    fn compile_empty() {
        assert_eq!(Compiler::compile("", Vec::new()).unwrap(), "");
        assert_eq!(Compiler::compile("/* nothing */", Vec::new()).unwrap(), "");
    }

    #[test]
    fn compile_reports_first_error() {
        let err = Compiler::compile("aa [:loop 2 { aa }", Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn state_persists_across_sources() {
        let mut state = State::new(Vec::new());
        let mut out = String::new();
        Compiler::compile_source(&Source::from_text("[:phrase hi] { hx ay }"), &mut state, &mut out)
            .unwrap();
        Compiler::compile_source(&Source::from_text("hi"), &mut state, &mut out).unwrap();
        assert_eq!(out, "[hx][ay]");
    }

    #[test]
    fn file_sources_name_their_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.opendec");
        std::fs::write(&path, "aa\n  zz").unwrap();

        let source = Source::from_file(&path).unwrap();
        let mut state = State::new(Vec::new());
        let mut out = String::new();
        let err = Compiler::compile_source(&source, &mut state, &mut out).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert_eq!(&*err.pos.file, path.display().to_string());
        assert_eq!((err.pos.line, err.pos.column), (1, 2));
    }
}
