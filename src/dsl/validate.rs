//! Command validation.
//!
//! Every command the engine (or this compiler) understands is a
//! [`CommandKind`]. [`validate`] checks a node's parameter count, types,
//! keywords, numeric ranges and context shape without touching any state.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{Command, Node, Param, Voice};
use super::error::CompileError;
use super::phonemes::{self, PhonemeClass, VOICE_PARAMS};

static SOUND_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^c*v+c*$").expect("sound pattern is a valid regex"));

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([a-zA-Z])|([_a-zA-Z][a-zA-Z0-9_]+))$").expect("identifier is a valid regex")
});

/// Commands known to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    // Engine commands
    Comma,
    Cp,
    Dv,
    Error,
    Mode,
    Name,
    /// `nb`, `nd`, ... `nw`: shorthand for `[:name X]`.
    NameAlias,
    Period,
    Pp,
    Phoneme,
    Pitch,
    Play,
    Pronounce,
    Punct,
    Rate,
    Say,
    Skip,
    Tone,
    Volume,

    // Compiler commands
    Bpm,
    Import,

    // Commands with context
    Loop,
    Phrase,
    Sound,
    Voice,
}

impl CommandKind {
    pub const ALL: &'static [CommandKind] = &[
        CommandKind::Comma,
        CommandKind::Cp,
        CommandKind::Dv,
        CommandKind::Error,
        CommandKind::Mode,
        CommandKind::Name,
        CommandKind::NameAlias,
        CommandKind::Period,
        CommandKind::Pp,
        CommandKind::Phoneme,
        CommandKind::Pitch,
        CommandKind::Play,
        CommandKind::Pronounce,
        CommandKind::Punct,
        CommandKind::Rate,
        CommandKind::Say,
        CommandKind::Skip,
        CommandKind::Tone,
        CommandKind::Volume,
        CommandKind::Bpm,
        CommandKind::Import,
        CommandKind::Loop,
        CommandKind::Phrase,
        CommandKind::Sound,
        CommandKind::Voice,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "comma" => CommandKind::Comma,
            "cp" => CommandKind::Cp,
            "dv" => CommandKind::Dv,
            "error" => CommandKind::Error,
            "mode" => CommandKind::Mode,
            "name" => CommandKind::Name,
            "nb" | "nd" | "nf" | "nh" | "nk" | "np" | "nr" | "nu" | "nw" => CommandKind::NameAlias,
            "period" => CommandKind::Period,
            "pp" => CommandKind::Pp,
            "phoneme" => CommandKind::Phoneme,
            "pitch" => CommandKind::Pitch,
            "play" => CommandKind::Play,
            "pronounce" => CommandKind::Pronounce,
            "punct" => CommandKind::Punct,
            "rate" => CommandKind::Rate,
            "say" => CommandKind::Say,
            "skip" => CommandKind::Skip,
            "tone" => CommandKind::Tone,
            "volume" => CommandKind::Volume,
            "bpm" => CommandKind::Bpm,
            "import" => CommandKind::Import,
            "loop" => CommandKind::Loop,
            "phrase" => CommandKind::Phrase,
            "sound" => CommandKind::Sound,
            "voice" => CommandKind::Voice,
            _ => return None,
        };
        Some(kind)
    }

    /// Only these commands may carry a `{ ... }` block.
    pub fn takes_context(self) -> bool {
        matches!(
            self,
            CommandKind::Loop | CommandKind::Phrase | CommandKind::Sound | CommandKind::Voice
        )
    }
}

/// True if `name` can name a phrase, sound or voice.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Validate a command or voice node. Phonemes are resolved (and checked)
/// by the processor, since that needs the registered names.
pub fn validate(node: &Node) -> Result<(), CompileError> {
    match node {
        Node::Command(cmd) => validate_command(cmd),
        Node::Voice(voice) => validate_voice(voice),
        Node::Phoneme(_) | Node::End(_) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Int,
    Str,
}

impl Expect {
    fn name(self) -> &'static str {
        match self {
            Expect::Int => "INT",
            Expect::Str => "STRING",
        }
    }

    fn accepts(self, param: &Param) -> bool {
        matches!(
            (self, param),
            (Expect::Int, Param::Int(_)) | (Expect::Str, Param::Str(_))
        )
    }
}

const ERROR_OPTIONS: &[&str] = &["ignore", "speak", "tone"];
const MODE_OPTIONS: &[&str] = &["math", "europe", "spell", "name", "citation", "latin", "table"];
const MODE_STATES: &[&str] = &["on", "off", "set"];
const PRONOUNCE_OPTIONS: &[&str] = &["alternate", "primary", "name", "noun", "adjective", "verb"];
const PUNCT_OPTIONS: &[&str] = &["none", "some", "all", "pass"];
const SAY_OPTIONS: &[&str] = &["clause", "word", "letter", "filtered", "line"];
const SKIP_OPTIONS: &[&str] = &["punct", "rule", "all", "off", "cpg", "none"];
const VOLUME_OPTIONS: &[&str] = &[
    "up", "lup", "rup", "down", "ldown", "rdown", "set", "lset", "rset",
];

/// Parameter checks against one command, reporting at its position.
struct Check<'a> {
    cmd: &'a Command,
}

impl Check<'_> {
    fn fail(&self, message: String) -> CompileError {
        CompileError::validation(message, &self.cmd.pos)
    }

    fn count(&self, expected: usize) -> Result<(), CompileError> {
        let got = self.cmd.params.len();
        if got != expected {
            return Err(self.fail(format!(
                "command '{}' takes {expected} parameter(s) - got {got}",
                self.cmd.name
            )));
        }
        Ok(())
    }

    fn types(&self, expected: &[Expect]) -> Result<(), CompileError> {
        for (i, (param, want)) in self.cmd.params.iter().zip(expected).enumerate() {
            if !want.accepts(param) {
                return Err(self.fail(format!(
                    "command '{}' parameter {} must be {} - got {}",
                    self.cmd.name,
                    i + 1,
                    want.name(),
                    param.type_name()
                )));
            }
        }
        Ok(())
    }

    fn shape(&self, expected: &[Expect]) -> Result<(), CompileError> {
        self.count(expected.len())?;
        self.types(expected)
    }

    fn str_at(&self, index: usize) -> &str {
        self.cmd.params[index].as_str().unwrap_or_default()
    }

    fn int_at(&self, index: usize) -> i64 {
        self.cmd.params[index].as_int().unwrap_or_default()
    }

    fn keyword(&self, index: usize, keywords: &[&str]) -> Result<(), CompileError> {
        let value = self.str_at(index);
        if !keywords.contains(&value) {
            return Err(self.fail(format!(
                "command '{}' parameter '{value}' is not a valid keyword - expected one of {}",
                self.cmd.name,
                keywords.join("|")
            )));
        }
        Ok(())
    }

    fn range(&self, index: usize, min: i64, max: i64) -> Result<(), CompileError> {
        let value = self.int_at(index);
        if value < min || value > max {
            return Err(self.fail(format!(
                "command '{}' parameter value {value} must be between {min} and {max}",
                self.cmd.name
            )));
        }
        Ok(())
    }

    fn identifier(&self, index: usize) -> Result<(), CompileError> {
        let value = self.str_at(index);
        if !is_identifier(value) {
            return Err(self.fail(format!(
                "command '{}' parameter '{value}' is not a valid name",
                self.cmd.name
            )));
        }
        Ok(())
    }

    fn non_empty_context(&self) -> Result<(), CompileError> {
        if self.cmd.context.is_empty() {
            return Err(self.fail(format!(
                "{} '{}' is missing its context",
                self.cmd.name,
                self.str_at(0)
            )));
        }
        Ok(())
    }
}

fn validate_command(cmd: &Command) -> Result<(), CompileError> {
    let kind = CommandKind::from_name(&cmd.name).ok_or_else(|| {
        CompileError::validation(format!("unrecognized command '{}'", cmd.name), &cmd.pos)
    })?;

    let check = Check { cmd };

    if !kind.takes_context() && !cmd.context.is_empty() {
        return Err(check.fail(format!("command '{}' does not take a context", cmd.name)));
    }

    match kind {
        CommandKind::NameAlias => Ok(()),
        CommandKind::Comma
        | CommandKind::Cp
        | CommandKind::Period
        | CommandKind::Pp
        | CommandKind::Pitch => check.shape(&[Expect::Int]),
        CommandKind::Play | CommandKind::Import => check.shape(&[Expect::Str]),
        CommandKind::Tone => check.shape(&[Expect::Int, Expect::Int]),
        CommandKind::Dv => {
            check.shape(&[Expect::Str, Expect::Int])?;
            let names: Vec<&str> = VOICE_PARAMS.iter().map(|p| p.name).collect();
            check.keyword(0, &names)?;
            match phonemes::voice_param(check.str_at(0)) {
                Some(p) => check.range(1, p.min, p.max),
                None => Ok(()),
            }
        }
        CommandKind::Error => {
            check.shape(&[Expect::Str])?;
            check.keyword(0, ERROR_OPTIONS)
        }
        CommandKind::Mode => {
            check.shape(&[Expect::Str, Expect::Str])?;
            check.keyword(0, MODE_OPTIONS)?;
            check.keyword(1, MODE_STATES)
        }
        CommandKind::Name => {
            check.shape(&[Expect::Str])?;
            check.identifier(0)
        }
        CommandKind::Phoneme => {
            check.shape(&[Expect::Str, Expect::Str])?;
            check.keyword(0, &["arpabet"])?;
            check.keyword(1, &["on", "off"])
        }
        CommandKind::Pronounce => {
            check.shape(&[Expect::Str])?;
            check.keyword(0, PRONOUNCE_OPTIONS)
        }
        CommandKind::Punct => {
            check.shape(&[Expect::Str])?;
            check.keyword(0, PUNCT_OPTIONS)
        }
        CommandKind::Rate => {
            check.shape(&[Expect::Int])?;
            check.range(0, 75, 600)
        }
        CommandKind::Say => {
            check.shape(&[Expect::Str])?;
            check.keyword(0, SAY_OPTIONS)
        }
        CommandKind::Skip => {
            check.shape(&[Expect::Str])?;
            check.keyword(0, SKIP_OPTIONS)
        }
        CommandKind::Volume => validate_volume(&check),
        CommandKind::Bpm => {
            check.shape(&[Expect::Int])?;
            check.range(0, 0, 60000)
        }
        CommandKind::Loop => {
            check.shape(&[Expect::Int])?;
            check.range(0, 0, i64::MAX)
        }
        CommandKind::Phrase => {
            check.shape(&[Expect::Str])?;
            check.identifier(0)?;
            check.non_empty_context()
        }
        CommandKind::Sound => validate_sound(&check),
        CommandKind::Voice => Err(check.fail(
            "voices must be declared as '[:voice NAME] { ... }'".to_string(),
        )),
    }
}

/// `[:volume OPTION VALUE]` or `[:volume sset LEFT RIGHT]`.
fn validate_volume(check: &Check<'_>) -> Result<(), CompileError> {
    match check.cmd.params.len() {
        3 => {
            check.types(&[Expect::Str, Expect::Int, Expect::Int])?;
            check.keyword(0, &["sset"])?;
            check.range(1, 0, 100)?;
            check.range(2, 0, 100)
        }
        _ => {
            check.shape(&[Expect::Str, Expect::Int])?;
            check.keyword(0, VOLUME_OPTIONS)?;
            check.range(1, 0, 100)
        }
    }
}

/// `[:sound NAME] { consonant* vowel+ consonant* }`
fn validate_sound(check: &Check<'_>) -> Result<(), CompileError> {
    check.shape(&[Expect::Str])?;
    check.identifier(0)?;
    check.non_empty_context()?;

    let name = check.str_at(0);
    let mut classes = String::new();
    for node in &check.cmd.context {
        let Node::Phoneme(phoneme) = node else {
            return Err(check.fail(format!(
                "sound '{name}' takes only phonemes - got '{node}'"
            )));
        };
        match phonemes::classify(&phoneme.symbol) {
            Some(PhonemeClass::Consonant) => classes.push('c'),
            Some(PhonemeClass::Vowel) => classes.push('v'),
            _ => {
                return Err(check.fail(format!(
                    "sound '{name}' can only contain vowel or consonant phonemes - got '{phoneme}'"
                )));
            }
        }
    }

    if !SOUND_PATTERN.is_match(&classes) {
        return Err(check.fail(format!(
            "sound '{name}' does not follow the consonant-vowel-consonant pattern"
        )));
    }
    Ok(())
}

fn validate_voice(voice: &Voice) -> Result<(), CompileError> {
    if !is_identifier(&voice.name) {
        return Err(CompileError::validation(
            format!("voice name '{}' is not a valid name", voice.name),
            &voice.pos,
        ));
    }

    for (key, &value) in &voice.params {
        let Some(param) = phonemes::voice_param(key) else {
            return Err(CompileError::validation(
                format!(
                    "voice '{}' contains unrecognized parameter '{key}'",
                    voice.name
                ),
                &voice.pos,
            ));
        };
        if value < param.min || value > param.max {
            return Err(CompileError::validation(
                format!(
                    "voice '{}' parameter '{key}' value {value} is not within {} - {}",
                    voice.name, param.min, param.max
                ),
                &voice.pos,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::error::ErrorKind;
    use crate::dsl::lexer::Lexer;
    use crate::dsl::parser::Parser;

    fn check(src: &str) -> Result<(), CompileError> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let nodes = Parser::new(tokens).parse().unwrap();
        validate(&nodes[0])
    }

    fn assert_valid(src: &str) {
        if let Err(e) = check(src) {
            panic!("{src:?} should be valid: {e}");
        }
    }

    fn assert_invalid(src: &str) {
        match check(src) {
            Ok(()) => panic!("{src:?} should be invalid"),
            Err(e) => assert_eq!(e.kind, ErrorKind::Validation, "{src:?}: {e}"),
        }
    }

    #[test]
    fn command_kind_lookup() {
        assert_eq!(CommandKind::from_name("cp"), Some(CommandKind::Cp));
        assert_eq!(CommandKind::from_name("nw"), Some(CommandKind::NameAlias));
        assert_eq!(CommandKind::from_name("na"), None);
        assert!(CommandKind::Loop.takes_context());
        assert!(!CommandKind::Rate.takes_context());
        assert_eq!(CommandKind::ALL.len(), 25);
    }

    #[test]
    fn identifiers() {
        for ok in ["a", "Z", "ab", "_a", "a_1", "Paul", "__"] {
            assert!(is_identifier(ok), "{ok}");
        }
        for bad in ["_", "1a", "a-b", "", "a.b"] {
            assert!(!is_identifier(bad), "{bad}");
        }
    }

    #[test]
    fn unknown_command() {
        assert_invalid("[:shout loud]");
    }

    #[test]
    fn base_commands() {
        for src in [
            "[:comma 50]",
            "[:cp 50]",
            "[:dv sx 0]",
            "[:dv hs 145]",
            "[:error ignore]",
            "[:mode math on]",
            "[:name Paul]",
            "[:nb]",
            "[:nw whatever 1 2.0]",
            "[:period 50]",
            "[:pp 50]",
            "[:phoneme arpabet on]",
            "[:pitch 35]",
            "[:play a.wav]",
            "[:pronounce noun]",
            "[:punct all]",
            "[:rate 75]",
            "[:rate 600]",
            "[:say clause]",
            "[:skip cpg]",
            "[:tone 100 1000]",
            "[:volume up 50]",
            "[:volume sset 0 100]",
        ] {
            assert_valid(src);
        }
    }

    #[test]
    fn parameter_count_and_types() {
        for src in [
            "[:comma]",
            "[:comma 50 50]",
            "[:comma x]",
            "[:comma 5.0]",
            "[:tone 100]",
            "[:tone 100 x]",
            "[:play 5]",
            "[:dv 5 sx]",
            "[:volume up]",
            "[:volume up 1 2 3]",
        ] {
            assert_invalid(src);
        }
    }

    #[test]
    fn keywords_and_ranges() {
        for src in [
            "[:dv zz 0]",
            "[:dv sx 2]",
            "[:dv hs 64]",
            "[:error loud]",
            "[:mode math maybe]",
            "[:mode poetry on]",
            "[:phoneme ipa on]",
            "[:pronounce verbish]",
            "[:rate 74]",
            "[:rate 601]",
            "[:skip some]",
            "[:volume sset 50 101]",
            "[:volume set 101]",
            "[:volume sset 50]",
            "[:volume up 5 5]",
            "[:bpm 60001]",
            "[:name x-y]",
        ] {
            assert_invalid(src);
        }
    }

    #[test]
    fn extended_commands() {
        assert_valid("[:bpm 0]");
        assert_valid("[:bpm 60000]");
        assert_valid("[:import lib/a.opendec]");
        assert_invalid("[:import]");
    }

    #[test]
    fn context_shape() {
        assert_valid("[:loop 0] { aa }");
        assert_valid("[:loop 3] { }");
        assert_valid("[:phrase hi] { hx ay [:cp 5] }");
        assert_invalid("[:phrase hi]");
        assert_invalid("[:phrase 1] { aa }");
        assert_invalid("[:cp 50] { aa }");
        assert_invalid("[:loop x] { aa }");
    }

    #[test]
    fn sound_pattern() {
        for ok in [
            "[:sound ba] { b aa }",
            "[:sound a] { aa }",
            "[:sound bab] { b aa b }",
            "[:sound str] { s t r aa iy n }",
        ] {
            assert_valid(ok);
        }
        for bad in [
            "[:sound b] { b }",
            "[:sound bab] { aa b aa }",
            "[:sound ba] { b _ aa }",
            "[:sound ba] { b [:cp 5] aa }",
            "[:sound ba] { b xx }",
            "[:sound ba]",
        ] {
            assert_invalid(bad);
        }
    }

    #[test]
    fn voices() {
        assert_valid("[:voice robot]");
        assert_valid("[:voice robot] { sx 0 hs 110 g4 86 }");
        assert_invalid("[:voice robot] { zz 1 }");
        assert_invalid("[:voice robot] { hs 146 }");
        assert_invalid("[:voice _] { sx 0 }");
    }

    #[test]
    fn phonemes_are_not_checked_here() {
        assert_valid("whatever<5>");
    }
}
