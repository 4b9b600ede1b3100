//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::AssistantEvent;
use crate::state::AssistantState;

/// Requests from a client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current assistant status
    GetStatus,

    /// Flip activation, like the floating button
    Toggle,

    /// Switch on; no-op when already active
    Activate,

    /// Switch off; no-op when already idle
    Deactivate,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to event notifications
    Subscribe,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current assistant status
    Status(AssistantStatus),

    /// Activation after a control request
    Toggled { active: bool },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Assistant event occurred
    Event { event: AssistantEvent },

    /// Events were dropped because the client fell behind
    Lagged { skipped: u64 },
}

/// Full assistant status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantStatus {
    /// Daemon version
    pub version: String,

    /// Reported assistant state
    pub state: AssistantState,

    /// Whether the assistant is switched on
    pub active: bool,

    /// Status line shown to the user
    pub status_message: String,

    /// Latest transcript
    pub recognized_text: String,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for AssistantStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: AssistantState::Idle,
            active: false,
            status_message: String::new(),
            recognized_text: String::new(),
            uptime_secs: 0,
        }
    }
}

impl AssistantStatus {
    /// Fold an event into the snapshot
    pub fn apply(&mut self, event: &AssistantEvent) {
        match event {
            AssistantEvent::StateChanged { to, .. } => self.state = *to,
            AssistantEvent::ActiveChanged { active } => self.active = *active,
            AssistantEvent::StatusChanged {
                status_message,
                recognized_text,
            } => {
                self.status_message = status_message.clone();
                self.recognized_text = recognized_text.clone();
            }
            _ => {}
        }
    }
}
