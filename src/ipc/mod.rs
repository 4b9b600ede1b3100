//! IPC module for daemon-client communication

mod protocol;
mod server;

pub use protocol::{AssistantStatus, Notification, Request, Response};
pub use server::Server;
