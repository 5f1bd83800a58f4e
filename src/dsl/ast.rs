//! Abstract Syntax Tree for OpenDec.
//!
//! Nodes print back to source text (`Display`), so a parsed node can be
//! re-encoded and parsed again into an equal node. Equality ignores
//! positions.

use std::collections::BTreeMap;
use std::fmt;

use super::cursor::Position;

/// Voice parameter keyword → value.
pub type VoiceParams = BTreeMap<String, i64>;

/// A parsed node.
#[derive(Debug, Clone)]
pub enum Node {
    Command(Command),
    Phoneme(Phoneme),
    Voice(Voice),
    End(Position),
}

impl Node {
    pub fn pos(&self) -> &Position {
        match self {
            Node::Command(c) => &c.pos,
            Node::Phoneme(p) => &p.pos,
            Node::Voice(v) => &v.pos,
            Node::End(pos) => pos,
        }
    }

    /// Name of the command this node invokes, if it is a command or voice.
    pub fn command_name(&self) -> Option<&str> {
        match self {
            Node::Command(c) => Some(&c.name),
            Node::Voice(_) => Some("voice"),
            Node::Phoneme(_) | Node::End(_) => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Command(a), Node::Command(b)) => a == b,
            (Node::Phoneme(a), Node::Phoneme(b)) => a == b,
            (Node::Voice(a), Node::Voice(b)) => a == b,
            (Node::End(_), Node::End(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Command(c) => c.fmt(f),
            Node::Phoneme(p) => p.fmt(f),
            Node::Voice(v) => v.fmt(f),
            Node::End(_) => Ok(()),
        }
    }
}

/// A positional command parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Param {
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Int(_) => "INT",
            Param::Float(_) => "FLOAT",
            Param::Str(_) => "STRING",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Param::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(v) => write!(f, "{v}"),
            Param::Float(v) => write_float(f, *v),
            Param::Str(s) => f.write_str(s),
        }
    }
}

/// Floats always keep a decimal point so they lex back as FLOAT.
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.fract() == 0.0 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

/// A phoneme duration: milliseconds, or beats once a tempo is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    Int(i64),
    Float(f64),
}

impl Default for Duration {
    fn default() -> Self {
        Duration::Int(0)
    }
}

impl Duration {
    pub fn as_f64(self) -> f64 {
        match self {
            Duration::Int(v) => v as f64,
            Duration::Float(v) => v,
        }
    }

    /// Duration in whole milliseconds under a tempo multiplier.
    pub fn to_millis(self, multiplier: f64) -> i64 {
        (self.as_f64() * multiplier).floor() as i64
    }
}

/// `[:name params...] { context }`
#[derive(Debug, Clone)]
pub struct Command {
    pub pos: Position,
    pub name: String,
    pub params: Vec<Param>,
    pub context: Vec<Node>,
}

impl Command {
    pub fn new(pos: Position, name: impl Into<String>) -> Self {
        Self {
            pos,
            name: name.into(),
            params: Vec::new(),
            context: Vec::new(),
        }
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.context == other.context
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[:{}", self.name)?;
        for p in &self.params {
            write!(f, " {p}")?;
        }
        f.write_str("]")?;

        if !self.context.is_empty() {
            f.write_str(" {")?;
            for node in &self.context {
                write!(f, " {node}")?;
            }
            f.write_str(" }")?;
        }
        Ok(())
    }
}

/// `symbol<duration,pitch>`
#[derive(Debug, Clone)]
pub struct Phoneme {
    pub pos: Position,
    pub symbol: String,
    pub duration: Duration,
    pub pitch: i64,
}

impl Phoneme {
    pub fn new(pos: Position, symbol: impl Into<String>) -> Self {
        Self {
            pos,
            symbol: symbol.into(),
            duration: Duration::default(),
            pitch: 0,
        }
    }

    /// Engine text for this phoneme with a concrete length in milliseconds.
    pub fn engine_text(symbol: &str, millis: i64, pitch: i64) -> String {
        let mut out = format!("[{symbol}");
        if millis != 0 || pitch != 0 {
            out.push('<');
            if millis != 0 {
                out.push_str(&millis.to_string());
            }
            if pitch != 0 {
                out.push(',');
                out.push_str(&pitch.to_string());
            }
            out.push('>');
        }
        out.push(']');
        out
    }
}

impl PartialEq for Phoneme {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.duration == other.duration && self.pitch == other.pitch
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)?;

        let show_duration = match self.duration {
            Duration::Int(v) => v != 0,
            Duration::Float(_) => true,
        };
        if show_duration || self.pitch != 0 {
            f.write_str("<")?;
            if show_duration {
                match self.duration {
                    Duration::Int(v) => write!(f, "{v}")?,
                    Duration::Float(v) => write_float(f, v)?,
                }
            }
            if self.pitch != 0 {
                write!(f, ",{}", self.pitch)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// `[:voice name] { key value, ... }`
#[derive(Debug, Clone)]
pub struct Voice {
    pub pos: Position,
    pub name: String,
    pub params: VoiceParams,
}

impl PartialEq for Voice {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[:voice {}]", self.name)?;
        if !self.params.is_empty() {
            let body: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k} {v}"))
                .collect();
            write!(f, " {{ {} }}", body.join(", "))?;
        }
        Ok(())
    }
}
