//! jarvis-daemon: Voice assistant daemon for the portfolio site
//!
//! This daemon provides:
//! - Wake word detection and single-command listening
//! - Rule-based command interpretation with spoken replies
//! - A controller that keeps capture and playback mutually exclusive
//! - IPC server for activation and status queries
//!
//! Speech runs against console backends: typed lines stand in for recognized
//! speech and replies are printed with a simulated speaking duration.

mod config;
mod events;
mod host;
mod interpreter;
mod ipc;
mod lifecycle;
mod speech;
mod state;

use std::time::Instant;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::AssistantEvent;
use crate::host::{ConsoleHost, Theme};
use crate::interpreter::Interpreter;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::speech::{ConsoleRecognizer, ConsoleSynthesizer, SpeechAdapter};
use crate::state::{ControlCommand, Controller};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "jarvis-daemon starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        wake_words = ?config.assistant.wake_words,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // Create channels for inter-component communication
    // Speech backends -> Controller
    let (speech_tx, speech_rx) = mpsc::unbounded_channel();
    // IPC server -> Controller
    let (control_tx, control_rx) = mpsc::channel(32);
    // Controller -> IPC server (for broadcasting events)
    let (event_tx, _event_rx) = broadcast::channel::<AssistantEvent>(64);

    let recognizer =
        ConsoleRecognizer::spawn(config.assistant.language.clone(), speech_tx.clone())?;
    let synthesizer = ConsoleSynthesizer::new(config.assistant.voice, speech_tx);
    let adapter = SpeechAdapter::new(
        recognizer,
        synthesizer,
        config.assistant.timings.speech_cooldown(),
    );

    let mut controller = Controller::new(
        adapter,
        ConsoleHost::new(Theme::default()),
        Interpreter::default(),
        &config.assistant,
        event_tx.clone(),
    );
    if config.assistant.greet_on_start {
        controller.schedule_greeting(Instant::now());
    }

    // Create IPC server; it forwards activation requests to the controller
    let server = Server::new(&config.socket_path, control_tx, event_tx.clone())?;

    // Subscribe to events for IPC status updates
    let mut ipc_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the controller (speech events, control requests, timers)
        _ = controller.run(control_rx, speech_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the IPC status snapshot in sync with the controller
        _ = async {
            loop {
                match ipc_event_rx.recv().await {
                    Ok(event) => {
                        debug!(%event, "assistant event");
                        server_for_events.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    controller.handle_control(ControlCommand::Deactivate, Instant::now());
    server.shutdown().await;

    info!("jarvis-daemon stopped");

    Ok(())
}
