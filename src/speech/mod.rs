//! Speech capability adapter
//!
//! Wraps a platform recognizer and synthesizer behind traits, assigns
//! session and utterance identifiers, and turns raw backend events into the
//! filtered signals the controller acts on.

mod adapter;
mod backend;
mod console;
#[cfg(test)]
pub mod mock;
mod types;

pub use adapter::{CooldownWindow, RecognitionSession, SpeechAdapter, SpeechSignal};
pub use backend::{Recognizer, Synthesizer};
pub use console::{ConsoleRecognizer, ConsoleSynthesizer};
pub use types::{
    ListenMode, RecognitionErrorKind, SessionId, SpeechError, SpeechEvent, Utterance, UtteranceId,
    VoiceSettings,
};
