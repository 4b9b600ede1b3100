//! Assistant state machine
//!
//! Provides the controller with three underlying modes:
//! - Idle: Switched off, no recognition
//! - WaitingForWakeWord: Continuous listening for a wake phrase
//! - Awake: Single-utterance command listening with an inactivity timeout
//!
//! Speaking and CoolingDown are reported on top of these while synthesis
//! plays or restarts are being held back.

mod machine;
mod retry;
mod timers;

pub use machine::{AssistantState, ControlCommand, ControlRequest, Controller};
