//! Events module for assistant activity
//!
//! Provides structured event types for state changes, listening and
//! speaking activity, and host side effects. Events are broadcast to IPC
//! subscribers as they happen.

use serde::{Deserialize, Serialize};

use crate::host::{SectionId, Theme};
use crate::speech::ListenMode;
use crate::state::AssistantState;

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Reported state changed
    StateChanged {
        from: AssistantState,
        to: AssistantState,
    },

    /// The assistant was switched on or off
    ActiveChanged { active: bool },

    /// A recognition session started
    ListeningStarted { mode: ListenMode },

    /// A wake phrase was heard
    WakeWordDetected { phrase: String },

    /// A command utterance was interpreted
    CommandRecognized {
        text: String,
        /// Display form of the resolved intent
        intent: String,
    },

    /// Speech output started
    Spoke { text: String },

    /// The host scrolled to a section
    Navigated { section: SectionId },

    /// The host switched themes
    ThemeChanged { theme: Theme },

    /// The status line or transcript changed
    StatusChanged {
        status_message: String,
        recognized_text: String,
    },

    /// Too many rapid aborts; restarts are suspended
    RetryBackoff {
        aborts: u32,
        /// Duration in milliseconds before the next restart
        cooldown_ms: u64,
    },

    /// Microphone access was refused
    PermissionDenied,

    /// The platform has no speech recognition
    Unsupported,
}

impl std::fmt::Display for AssistantEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantEvent::StateChanged { from, to } => {
                write!(f, "STATE_CHANGED ({} -> {})", from, to)
            }
            AssistantEvent::ActiveChanged { active } => {
                write!(f, "{}", if *active { "ACTIVATED" } else { "DEACTIVATED" })
            }
            AssistantEvent::ListeningStarted { mode } => write!(f, "LISTENING_STARTED ({})", mode),
            AssistantEvent::WakeWordDetected { phrase } => {
                write!(f, "WAKE_WORD_DETECTED ({})", phrase)
            }
            AssistantEvent::CommandRecognized { intent, .. } => {
                write!(f, "COMMAND_RECOGNIZED ({})", intent)
            }
            AssistantEvent::Spoke { .. } => write!(f, "SPOKE"),
            AssistantEvent::Navigated { section } => write!(f, "NAVIGATED ({})", section),
            AssistantEvent::ThemeChanged { theme } => write!(f, "THEME_CHANGED ({})", theme),
            AssistantEvent::StatusChanged { status_message, .. } => {
                write!(f, "STATUS_CHANGED ({})", status_message)
            }
            AssistantEvent::RetryBackoff { aborts, cooldown_ms } => {
                write!(f, "RETRY_BACKOFF ({} aborts, {}ms)", aborts, cooldown_ms)
            }
            AssistantEvent::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            AssistantEvent::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}
