//! Processor: expands parsed nodes into the engine's instruction stream.
//!
//! Commands are validated and then handled by their [`Behavior`]. Phonemes
//! are resolved against the built-in phoneme set and the phrases and
//! sounds registered in the [`State`]. Output for each top-level node is
//! built in a buffer and handed to the [`Sink`] in one chunk, so imports and
//! loops always land exactly where they appear in the source.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ast::{Command, Node, Param, Phoneme};
use super::error::CompileError;
use super::lexer::Lexer;
use super::output::{FileSystem, Sink};
use super::parser::Parser;
use super::phonemes::{self, VOICE_PARAMS};
use super::state::{self, State};
use super::validate::{self, CommandKind};

/// Length of every consonant in an expanded sound, in milliseconds.
pub const CONSONANT_MS: i64 = 15;

/// How the processor treats a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Passed to the engine as written.
    Bypass,
    /// Dropped; these would change engine state the compiler relies on.
    Ignore,
    /// Stored in the compilation state.
    Register,
    /// Handled by the compiler itself.
    Specialized,
}

impl CommandKind {
    pub fn behavior(self) -> Behavior {
        match self {
            CommandKind::Comma
            | CommandKind::Cp
            | CommandKind::Dv
            | CommandKind::Error
            | CommandKind::NameAlias
            | CommandKind::Period
            | CommandKind::Pp
            | CommandKind::Punct
            | CommandKind::Rate
            | CommandKind::Say
            | CommandKind::Skip
            | CommandKind::Tone
            | CommandKind::Volume => Behavior::Bypass,
            CommandKind::Mode
            | CommandKind::Phoneme
            | CommandKind::Pitch
            | CommandKind::Pronounce => Behavior::Ignore,
            CommandKind::Phrase | CommandKind::Sound | CommandKind::Voice => Behavior::Register,
            CommandKind::Bpm
            | CommandKind::Import
            | CommandKind::Loop
            | CommandKind::Name
            | CommandKind::Play => Behavior::Specialized,
        }
    }
}

pub struct Processor<'a> {
    state: &'a mut State,
    sink: &'a mut dyn Sink,
    fs: &'a dyn FileSystem,
    /// Directory relative `import` and `play` paths are tried against first.
    dir: PathBuf,
    /// Files currently being processed, outermost first.
    imports: Vec<PathBuf>,
    /// Phrases currently being replayed.
    phrases: Vec<String>,
}

impl<'a> Processor<'a> {
    /// Processor for in-memory text, resolving paths from the working
    /// directory of `state`.
    pub fn new(state: &'a mut State, sink: &'a mut dyn Sink, fs: &'a dyn FileSystem) -> Self {
        let dir = state.cwd().to_path_buf();
        Self {
            state,
            sink,
            fs,
            dir,
            imports: Vec::new(),
            phrases: Vec::new(),
        }
    }

    /// Processor for the nodes of the file at `path`.
    pub fn for_file(mut self, path: &Path) -> Self {
        let path = state::absolute(self.state.cwd(), path);
        if let Some(parent) = path.parent() {
            self.dir = parent.to_path_buf();
        }
        self.imports.push(path);
        self
    }

    /// Process nodes up to the end marker, emitting one chunk per node.
    pub fn process(&mut self, nodes: &[Node]) -> Result<(), CompileError> {
        info!("processor: processing {} nodes", nodes.len());
        for node in nodes {
            if let Node::End(_) = node {
                break;
            }
            let mut chunk = String::new();
            self.expand(node, &mut chunk)?;
            if !chunk.is_empty() {
                self.sink.emit(&chunk).map_err(|e| {
                    CompileError::io(&e, "could not write compiled output", node.pos())
                })?;
            }
        }
        Ok(())
    }

    fn expand(&mut self, node: &Node, out: &mut String) -> Result<(), CompileError> {
        debug!("processor: {node}");
        match node {
            Node::Command(_) | Node::Voice(_) => self.command(node, out),
            Node::Phoneme(phoneme) => self.phoneme(phoneme, out),
            Node::End(_) => Ok(()),
        }
    }

    fn command(&mut self, node: &Node, out: &mut String) -> Result<(), CompileError> {
        validate::validate(node)?;

        let cmd = match node {
            Node::Command(cmd) => cmd,
            // voices only ever register
            _ => return self.state.register(node),
        };
        let kind = CommandKind::from_name(&cmd.name).ok_or_else(|| {
            CompileError::validation(format!("unrecognized command '{}'", cmd.name), &cmd.pos)
        })?;

        match kind.behavior() {
            Behavior::Bypass => out.push_str(&cmd.to_string()),
            Behavior::Ignore => debug!("processor: ignoring '{cmd}'"),
            Behavior::Register => self.state.register(node)?,
            Behavior::Specialized => self.specialized(kind, cmd, out)?,
        }
        Ok(())
    }

    fn specialized(
        &mut self,
        kind: CommandKind,
        cmd: &Command,
        out: &mut String,
    ) -> Result<(), CompileError> {
        match kind {
            CommandKind::Bpm => {
                self.state.set_tempo(int_param(cmd, 0)?);
                Ok(())
            }
            CommandKind::Import => self.import(cmd, out),
            CommandKind::Loop => self.repeat(cmd, out),
            CommandKind::Name => self.name(cmd, out),
            CommandKind::Play => self.play(cmd, out),
            other => Err(CompileError::validation(
                format!("command '{}' ({other:?}) has no compiler handler", cmd.name),
                &cmd.pos,
            )),
        }
    }

    fn import(&mut self, cmd: &Command, out: &mut String) -> Result<(), CompileError> {
        let path = self.resolve(str_param(cmd, 0)?, cmd, "import")?;
        if self.imports.contains(&path) {
            return Err(CompileError::resolution(
                format!("circular import of '{}'", path.display()),
                &cmd.pos,
            ));
        }

        info!("processor: importing '{}'", path.display());
        let text = self.fs.read_to_string(&path).map_err(|e| {
            CompileError::io(&e, format!("could not read '{}'", path.display()), &cmd.pos)
        })?;
        let tokens = Lexer::with_file(&text, &path.display().to_string()).tokenize()?;
        let nodes = Parser::new(tokens).parse()?;

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let outer_dir = std::mem::replace(&mut self.dir, dir);
        self.imports.push(path);

        let result = self.expand_all(&nodes, out);

        let path = self.imports.pop().unwrap_or_default();
        self.dir = outer_dir;
        result?;
        info!("processor: finished importing '{}'", path.display());
        Ok(())
    }

    fn repeat(&mut self, cmd: &Command, out: &mut String) -> Result<(), CompileError> {
        let count = int_param(cmd, 0)?;
        let count = usize::try_from(count).map_err(|_| {
            CompileError::validation(format!("loop count {count} must not be negative"), &cmd.pos)
        })?;

        info!("processor: expanding loop x{count} at {}", cmd.pos);
        let mut body = String::new();
        self.expand_all(&cmd.context, &mut body)?;
        if body.is_empty() {
            return Ok(());
        }

        let too_large = || {
            CompileError::runtime(
                format!("loop x{count} of {} bytes is too large to expand", body.len()),
                &cmd.pos,
            )
        };
        let total = body.len().checked_mul(count).ok_or_else(too_large)?;
        out.try_reserve_exact(total).map_err(|_| too_large())?;
        for _ in 0..count {
            out.push_str(&body);
        }
        Ok(())
    }

    fn name(&mut self, cmd: &Command, out: &mut String) -> Result<(), CompileError> {
        let name = str_param(cmd, 0)?;
        if phonemes::is_default_voice(name) {
            out.push_str(&cmd.to_string());
            return Ok(());
        }

        let voice = self.state.voice(name).ok_or_else(|| {
            CompileError::resolution(format!("voice '{name}' is not defined"), &cmd.pos)
        })?;
        for param in VOICE_PARAMS {
            if let Some(value) = voice.get(param.name) {
                out.push_str(&format!("[:dv {} {value}]", param.name));
            }
        }
        Ok(())
    }

    fn play(&mut self, cmd: &Command, out: &mut String) -> Result<(), CompileError> {
        let path = self.resolve(str_param(cmd, 0)?, cmd, "play")?;
        let mut resolved = cmd.clone();
        resolved.params[0] = Param::Str(path.display().to_string());
        out.push_str(&resolved.to_string());
        Ok(())
    }

    /// First existing file named `name` in the current directory or an
    /// include directory.
    fn resolve(&self, name: &str, cmd: &Command, action: &str) -> Result<PathBuf, CompileError> {
        let dirs = std::iter::once(&self.dir).chain(self.state.includes());
        for dir in dirs {
            let path = state::absolute(dir, Path::new(name));
            if self.fs.is_file(&path) {
                debug!("processor: resolved '{name}' -> '{}'", path.display());
                return Ok(path);
            }
        }
        Err(CompileError::resolution(
            format!("could not {action} file '{name}' - file not found"),
            &cmd.pos,
        ))
    }

    fn phoneme(&mut self, phoneme: &Phoneme, out: &mut String) -> Result<(), CompileError> {
        let millis = phoneme.duration.to_millis(self.state.multiplier());
        let symbol = &phoneme.symbol;

        if phonemes::is_phoneme(symbol) {
            out.push_str(&Phoneme::engine_text(symbol, millis, phoneme.pitch));
            return Ok(());
        }

        if let Some(nodes) = self.state.phrase(symbol) {
            if self.phrases.contains(symbol) {
                return Err(CompileError::resolution(
                    format!("phrase '{symbol}' refers to itself"),
                    &phoneme.pos,
                ));
            }
            self.phrases.push(symbol.clone());
            let result = self.expand_all(&nodes, out);
            self.phrases.pop();
            return result;
        }

        if let Some(sound) = self.state.sound(symbol) {
            return expand_sound(phoneme, &sound, millis, out);
        }

        Err(CompileError::resolution(
            format!("unrecognized phoneme, sound, or phrase '{symbol}'"),
            &phoneme.pos,
        ))
    }

    fn expand_all(&mut self, nodes: &[Node], out: &mut String) -> Result<(), CompileError> {
        for node in nodes {
            self.expand(node, out)?;
        }
        Ok(())
    }
}

/// Leading and trailing consonants get [`CONSONANT_MS`]; the vowels split
/// what is left evenly and take the invocation's pitch.
fn expand_sound(
    invocation: &Phoneme,
    sound: &[Phoneme],
    millis: i64,
    out: &mut String,
) -> Result<(), CompileError> {
    let lead = sound
        .iter()
        .take_while(|p| phonemes::is_consonant(&p.symbol))
        .count();
    let trail = sound[lead..]
        .iter()
        .rev()
        .take_while(|p| phonemes::is_consonant(&p.symbol))
        .count();
    let vowels = &sound[lead..sound.len() - trail];

    let minimum = CONSONANT_MS * (lead + trail) as i64;
    if millis < minimum {
        return Err(CompileError::runtime(
            format!(
                "sound '{}' must have minimum length {minimum}ms - got {millis}ms",
                invocation.symbol
            ),
            &invocation.pos,
        ));
    }
    if vowels.is_empty() {
        return Err(CompileError::runtime(
            format!("sound '{}' has no vowels", invocation.symbol),
            &invocation.pos,
        ));
    }
    let each = (millis - minimum) / vowels.len() as i64;

    for p in &sound[..lead] {
        out.push_str(&Phoneme::engine_text(&p.symbol, CONSONANT_MS, 0));
    }
    for p in vowels {
        out.push_str(&Phoneme::engine_text(&p.symbol, each, invocation.pitch));
    }
    for p in &sound[sound.len() - trail..] {
        out.push_str(&Phoneme::engine_text(&p.symbol, CONSONANT_MS, 0));
    }
    Ok(())
}

fn int_param(cmd: &Command, index: usize) -> Result<i64, CompileError> {
    cmd.params.get(index).and_then(Param::as_int).ok_or_else(|| {
        CompileError::validation(
            format!("command '{}' expects an INT parameter", cmd.name),
            &cmd.pos,
        )
    })
}

fn str_param(cmd: &Command, index: usize) -> Result<&str, CompileError> {
    cmd.params.get(index).and_then(Param::as_str).ok_or_else(|| {
        CompileError::validation(
            format!("command '{}' expects a STRING parameter", cmd.name),
            &cmd.pos,
        )
    })
}
