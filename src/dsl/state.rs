//! Compilation state shared by a top-level file and everything it imports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use super::ast::{Node, Phoneme, VoiceParams};
use super::error::CompileError;
use super::phonemes;

/// Tempo, include directories and every registered phrase, sound and voice.
#[derive(Debug)]
pub struct State {
    multiplier: f64,
    cwd: PathBuf,
    includes: Vec<PathBuf>,
    phrases: HashMap<String, Rc<[Node]>>,
    sounds: HashMap<String, Rc<[Phoneme]>>,
    voices: HashMap<String, VoiceParams>,
}

impl State {
    /// State rooted at the process working directory.
    pub fn new(includes: Vec<PathBuf>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_cwd(cwd, includes)
    }

    /// State rooted at `cwd`. Relative include directories are taken
    /// relative to it, and `cwd` itself is always searched first.
    pub fn with_cwd(cwd: impl Into<PathBuf>, includes: Vec<PathBuf>) -> Self {
        let cwd = cwd.into();
        let mut dirs = vec![cwd.clone()];
        dirs.extend(includes.iter().map(|dir| absolute(&cwd, dir)));
        debug!("state: include directories {:?}", dirs);

        Self {
            multiplier: 1.0,
            cwd,
            includes: dirs,
            phrases: HashMap::new(),
            sounds: HashMap::new(),
            voices: HashMap::new(),
        }
    }

    /// Milliseconds per duration unit under the current tempo.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Set beats per minute; 0 switches back to plain milliseconds.
    pub fn set_tempo(&mut self, bpm: i64) {
        self.multiplier = if bpm == 0 {
            1.0
        } else {
            60000.0 / bpm as f64
        };
        info!("state: bpm set to {bpm} (x{:.3})", self.multiplier);
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    pub fn phrase(&self, name: &str) -> Option<Rc<[Node]>> {
        self.phrases.get(name).cloned()
    }

    pub fn sound(&self, name: &str) -> Option<Rc<[Phoneme]>> {
        self.sounds.get(name).cloned()
    }

    pub fn voice(&self, name: &str) -> Option<&VoiceParams> {
        self.voices.get(name)
    }

    /// Register a `[:phrase]`, `[:sound]` or voice definition.
    pub fn register(&mut self, node: &Node) -> Result<(), CompileError> {
        match node {
            Node::Voice(voice) => {
                if phonemes::is_default_voice(&voice.name) {
                    return Err(CompileError::registration(
                        format!("cannot overwrite default voice '{}'", voice.name),
                        &voice.pos,
                    ));
                }
                if self.voices.contains_key(&voice.name) {
                    return Err(CompileError::registration(
                        format!("voice '{}' is already registered", voice.name),
                        &voice.pos,
                    ));
                }

                let mut params = phonemes::default_voice_params();
                params.extend(voice.params.iter().map(|(k, v)| (k.clone(), *v)));
                self.voices.insert(voice.name.clone(), params);
                info!("state: registered voice '{}'", voice.name);
                Ok(())
            }
            Node::Command(cmd) if cmd.name == "phrase" || cmd.name == "sound" => {
                let name = cmd
                    .params
                    .first()
                    .and_then(|p| p.as_str())
                    .ok_or_else(|| {
                        CompileError::registration(
                            format!("{} is missing its name", cmd.name),
                            &cmd.pos,
                        )
                    })?;
                self.check_free(&cmd.name, name, node)?;

                if cmd.name == "phrase" {
                    self.phrases
                        .insert(name.to_string(), cmd.context.clone().into());
                } else {
                    let sound: Vec<Phoneme> = cmd
                        .context
                        .iter()
                        .filter_map(|n| match n {
                            Node::Phoneme(p) => Some(p.clone()),
                            _ => None,
                        })
                        .collect();
                    self.sounds.insert(name.to_string(), sound.into());
                }
                info!("state: registered {} '{name}'", cmd.name);
                debug!("state: {} '{name}' -> {node}", cmd.name);
                Ok(())
            }
            other => Err(CompileError::registration(
                format!(
                    "cannot register '{}'",
                    other.command_name().unwrap_or("phoneme")
                ),
                other.pos(),
            )),
        }
    }

    /// A phrase or sound name must not shadow a phoneme or another definition.
    fn check_free(&self, kind: &str, name: &str, node: &Node) -> Result<(), CompileError> {
        let taken = if phonemes::is_phoneme(name) {
            Some("a phoneme")
        } else if self.phrases.contains_key(name) {
            Some("already a registered phrase")
        } else if self.sounds.contains_key(name) {
            Some("already a registered sound")
        } else {
            None
        };

        match taken {
            Some(reason) => Err(CompileError::registration(
                format!("cannot register {kind} '{name}' - it is {reason}"),
                node.pos(),
            )),
            None => Ok(()),
        }
    }
}

/// `path` made absolute against `base`, with `.` components removed.
pub fn absolute(base: &Path, path: &Path) -> PathBuf {
    base.join(path).components().collect()
}
