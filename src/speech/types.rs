//! Speech event and identifier types shared by backends and the adapter

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Identifies one recognition session (one start/stop cycle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Identifies one synthesized utterance (one `speak` call)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// How the recognizer should listen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenMode {
    /// Continuous recognition while waiting for the wake word
    WakeWord,
    /// Single-utterance recognition for one command
    Command,
}

impl ListenMode {
    /// Whether the platform recognizer should keep running across results
    pub fn is_continuous(self) -> bool {
        matches!(self, ListenMode::WakeWord)
    }
}

impl std::fmt::Display for ListenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenMode::WakeWord => write!(f, "wake-word"),
            ListenMode::Command => write!(f, "command"),
        }
    }
}

/// A recognized text fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// Interim results are displayed only; final results are dispatched
    pub is_final: bool,
    pub timestamp: Instant,
}

impl Utterance {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            timestamp: Instant::now(),
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            timestamp: Instant::now(),
        }
    }

    /// Lowercased, trimmed text as consumed by the interpreter
    pub fn normalized(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// Recognizer failure categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone access refused; fatal to the activation
    PermissionDenied,
    /// Nothing was heard before the recognizer gave up
    NoSpeech,
    /// The session was aborted
    Aborted,
    /// Anything else the platform reports
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse a platform error code (`not-allowed`, `no-speech`, `aborted`, ...)
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" | "permission-denied" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission-denied"),
            Self::NoSpeech => write!(f, "no-speech"),
            Self::Aborted => write!(f, "aborted"),
            Self::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Raw events delivered by speech backends
#[derive(Debug, Clone)]
pub enum SpeechEvent {
    Result {
        session: SessionId,
        utterance: Utterance,
    },
    RecognitionStart {
        session: SessionId,
    },
    RecognitionEnd {
        session: SessionId,
    },
    RecognitionError {
        session: SessionId,
        kind: RecognitionErrorKind,
    },
    SpeechStart {
        utterance: UtteranceId,
    },
    SpeechEnd {
        utterance: UtteranceId,
    },
    SpeechError {
        utterance: UtteranceId,
        message: String,
    },
}

/// Synthesis voice parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

/// Errors raised by speech backends
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("recognizer is already running")]
    AlreadyRunning,

    #[error("recognizer failed to start: {0}")]
    Start(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("failed to send speech event to channel")]
    ChannelSend,
}
