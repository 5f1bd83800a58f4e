//! OpenDec — a compiler from speech-synthesis markup to a flat engine
//! instruction stream.

pub mod config;
pub mod dsl;
