//! Unix domain socket server for IPC
//!
//! Provides request-response communication, forwards activation requests to
//! the controller, and pushes assistant events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::AssistantEvent;
use crate::state::{ControlCommand, ControlRequest};

use super::protocol::{AssistantStatus, Notification, Request, Response};

/// Largest accepted request body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: ClientContext,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: AssistantStatus,
    start_time: std::time::Instant,
}

/// Handles every connection task needs
#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    control_tx: mpsc::Sender<ControlRequest>,
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        control_tx: mpsc::Sender<ControlRequest>,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: AssistantStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared: ClientContext {
                state,
                control_tx,
                event_tx,
            },
            shutdown_tx,
        })
    }

    /// Fold a controller event into the status snapshot
    pub async fn apply_event(&self, event: &AssistantEvent) {
        let mut state = self.shared.state.write().await;
        let old_state = state.status.state;
        state.status.apply(event);

        if old_state != state.status.state {
            debug!(
                from = %old_state,
                to = %state.status.state,
                "IPC server: state updated"
            );
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let ctx = self.shared.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, ctx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Requests are read on a separate task so that pushing a notification
    /// never interrupts a partially read frame.
    async fn handle_client(stream: UnixStream, ctx: ClientContext) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));
        let mut events: Option<broadcast::Receiver<AssistantEvent>> = None;

        let result = async {
            loop {
                tokio::select! {
                    request = request_rx.recv() => {
                        let Some(request) = request else { break };
                        let response = match request {
                            Ok(request) => {
                                debug!(?request, "received request");
                                let (response, subscribe) =
                                    Self::process_request(request, &ctx).await;
                                if subscribe && events.is_none() {
                                    debug!("client subscribed to notifications");
                                    events = Some(ctx.event_tx.subscribe());
                                }
                                response
                            }
                            Err(message) => Response::error("invalid_request", message),
                        };
                        Self::send_message(&mut writer, &response).await?;
                    }
                    event = next_event(&mut events) => {
                        let notification = match event {
                            Ok(event) => Notification::Event { event },
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(skipped, "subscriber lagged");
                                Notification::Lagged { skipped }
                            }
                            Err(RecvError::Closed) => {
                                events = None;
                                continue;
                            }
                        };
                        Self::send_message(&mut writer, &notification).await?;
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until the client disconnects
    async fn read_requests<R: AsyncRead + Unpin>(
        mut reader: R,
        request_tx: mpsc::Sender<std::result::Result<Request, String>>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let request =
                serde_json::from_slice::<Request>(&msg_buf).map_err(|e| e.to_string());
            if request_tx.send(request).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, ctx: &ClientContext) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let state = ctx.state.read().await;
                let mut status = state.status.clone();
                status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(status), false)
            }

            Request::Toggle => (Self::forward_control(ControlCommand::Toggle, ctx).await, false),

            Request::Activate => (
                Self::forward_control(ControlCommand::Activate, ctx).await,
                false,
            ),

            Request::Deactivate => (
                Self::forward_control(ControlCommand::Deactivate, ctx).await,
                false,
            ),

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Hand a command to the controller and wait for the resulting activation
    async fn forward_control(command: ControlCommand, ctx: &ClientContext) -> Response {
        let (request, reply) = ControlRequest::new(command);
        if ctx.control_tx.send(request).await.is_err() {
            return Response::error("unavailable", "controller is not running");
        }

        match reply.await {
            Ok(active) => {
                info!(?command, active, "activation changed via IPC");
                Response::Toggled { active }
            }
            Err(_) => Response::error("unavailable", "controller dropped the request"),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; never resolves otherwise
async fn next_event(
    events: &mut Option<broadcast::Receiver<AssistantEvent>>,
) -> std::result::Result<AssistantEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AssistantState;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "jarvis-test-{}-{}.sock",
            std::process::id(),
            name
        ))
    }

    async fn request(stream: &mut UnixStream, request: &Request) -> serde_json::Value {
        Server::send_message(stream, request).await.unwrap();
        read_frame(stream).await
    }

    async fn read_frame(stream: &mut UnixStream) -> serde_json::Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn start_server(
        name: &str,
    ) -> (
        Arc<Server>,
        PathBuf,
        mpsc::Receiver<ControlRequest>,
        broadcast::Sender<AssistantEvent>,
    ) {
        let path = socket_path(name);
        let (control_tx, control_rx) = mpsc::channel(4);
        let (event_tx, _) = broadcast::channel(16);
        let server = Arc::new(Server::new(&path, control_tx, event_tx.clone()).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });
        (server, path, control_rx, event_tx)
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let (server, path, _control_rx, _event_tx) = start_server("ping");
        server
            .apply_event(&AssistantEvent::StateChanged {
                from: AssistantState::Idle,
                to: AssistantState::WaitingForWakeWord,
            })
            .await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let pong = request(&mut stream, &Request::Ping).await;
        assert_eq!(pong["type"], "pong");

        let status = request(&mut stream, &Request::GetStatus).await;
        assert_eq!(status["type"], "status");
        assert_eq!(status["state"], "waiting_for_wake_word");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_toggle_forwarded_to_controller() {
        let (server, path, mut control_rx, _event_tx) = start_server("toggle");
        tokio::spawn(async move {
            while let Some(request) = control_rx.recv().await {
                assert_eq!(request.command, ControlCommand::Toggle);
                if let Some(reply) = request.reply {
                    let _ = reply.send(true);
                }
            }
        });

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let response = request(&mut stream, &Request::Toggle).await;
        assert_eq!(response["type"], "toggled");
        assert_eq!(response["active"], true);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let (server, path, _control_rx, event_tx) = start_server("subscribe");

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let response = request(&mut stream, &Request::Subscribe).await;
        assert_eq!(response["type"], "subscribed");

        event_tx
            .send(AssistantEvent::WakeWordDetected {
                phrase: "hey talha".to_string(),
            })
            .unwrap();

        let notification = read_frame(&mut stream).await;
        assert_eq!(notification["type"], "event");
        assert_eq!(notification["event"]["type"], "wake_word_detected");
        assert_eq!(notification["event"]["phrase"], "hey talha");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_request_gets_error() {
        let (server, path, _control_rx, _event_tx) = start_server("invalid");

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let body = br#"{"type":"launch_rockets"}"#;
        stream
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(body).await.unwrap();

        let response = read_frame(&mut stream).await;
        assert_eq!(response["type"], "error");
        assert_eq!(response["code"], "invalid_request");

        server.shutdown().await;
    }
}
