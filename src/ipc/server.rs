//! Unix domain socket server for IPC
//!
//! Provides request-response access to the controller and pushes controller
//! events to clients that subscribed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::controller::{ControllerError, VoiceHandle};
use crate::events::VoiceEvent;

use super::protocol::{ControllerStatus, Push, Request, Response, MAX_MESSAGE_LEN};

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    handle: VoiceHandle,
    start_time: Instant,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(socket_path: &Path, handle: VoiceHandle) -> Result<Self> {
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

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            handle,
            start_time: Instant::now(),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let handle = self.handle.clone();
                    let start_time = self.start_time;
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, handle, start_time) => {
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
    async fn handle_client(
        stream: UnixStream,
        handle: VoiceHandle,
        start_time: Instant,
    ) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut forwarder = None;

        let result = async {
            while let Some(body) = read_frame(&mut reader).await? {
                let response = match serde_json::from_slice::<Request>(&body) {
                    Ok(request) => {
                        debug!(?request, "received request");
                        Self::process_request(request, &handle, start_time)
                    }
                    Err(e) => {
                        warn!(%e, "malformed request");
                        Response::Error {
                            code: "bad_request".to_string(),
                            message: e.to_string(),
                        }
                    }
                };

                // Subscribe before confirming so no event after the reply is missed
                let events = (response == Response::Subscribed && forwarder.is_none())
                    .then(|| handle.subscribe());

                write_frame(&mut *writer.lock().await, &response).await?;

                if let Some(events) = events {
                    debug!("client subscribed to events");
                    forwarder = Some(tokio::spawn(forward_events(events, Arc::clone(&writer))));
                }
            }
            debug!("client disconnected");
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        result
    }

    /// Process a request and return a response
    fn process_request(request: Request, handle: &VoiceHandle, start_time: Instant) -> Response {
        let accepted = |result: Result<(), ControllerError>| match result {
            Ok(()) => Response::Accepted,
            Err(e) => Response::Error {
                code: "stopped".to_string(),
                message: e.to_string(),
            },
        };

        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(ControllerStatus {
                version: env!("CARGO_PKG_VERSION").to_string(),
                status: handle.status(),
                transcript: handle.transcript(),
                supported: handle.is_supported(),
                uptime_secs: start_time.elapsed().as_secs(),
            }),

            Request::StartListening => accepted(handle.start_listening()),

            Request::StopListening => accepted(handle.stop_listening()),

            // The client does not wait for the utterance to finish
            Request::Speak { text } => accepted(handle.speak(text).map(drop)),

            Request::Subscribe => Response::Subscribed,
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

/// Push controller events to one subscribed client until it goes away
async fn forward_events(mut events: broadcast::Receiver<VoiceEvent>, writer: SharedWriter) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let push = Push::Event { event };
                if let Err(e) = write_frame(&mut *writer.lock().await, &push).await {
                    debug!(?e, "event push failed, dropping subscription");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Read one length-prefixed frame. `None` on a clean disconnect.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        bail!("message too large: {} bytes", len);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::collab::{LogNotifier, OfflineAnswerer};
    use crate::controller::{ControllerEvent, ControllerParts, ControllerSettings, VoiceController};
    use crate::engine::{ConsoleRecognizer, ConsoleSynthesizer};
    use crate::status::Status;

    fn controller() -> (
        VoiceController,
        mpsc::UnboundedReceiver<ControllerEvent>,
        broadcast::Sender<VoiceEvent>,
    ) {
        let (event_tx, _) = broadcast::channel(16);
        let (controller, rx) = VoiceController::new(
            ControllerParts {
                recognizer: Box::new(ConsoleRecognizer::new()),
                synthesizer: Box::new(ConsoleSynthesizer::new(180)),
                answerer: Arc::new(OfflineAnswerer),
                notifier: Arc::new(LogNotifier),
            },
            ControllerSettings::default(),
            event_tx.clone(),
        );
        (controller, rx, event_tx)
    }

    async fn request(stream: &mut UnixStream, request: &Request) -> Response {
        write_frame(stream, request).await.unwrap();
        let body = read_frame(stream).await.unwrap().unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_status_reflects_controller() {
        let (controller, _rx, _events) = controller();
        let response =
            Server::process_request(Request::GetStatus, &controller.handle(), Instant::now());

        match response {
            Response::Status(status) => {
                assert_eq!(status.status, Status::Idle);
                assert!(status.supported);
                assert_eq!(status.transcript, "");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_commands_fail_once_controller_is_gone() {
        let (controller, rx, _events) = controller();
        let handle = controller.handle();
        assert_eq!(
            Server::process_request(Request::StartListening, &handle, Instant::now()),
            Response::Accepted
        );

        drop(rx);
        assert!(matches!(
            Server::process_request(Request::Speak { text: "hi".into() }, &handle, Instant::now()),
            Response::Error { code, .. } if code == "stopped"
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&((MAX_MESSAGE_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();
        assert!(read_frame(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn test_client_session_over_socket() {
        let (controller, _rx, event_tx) = controller();
        let (mut client, server_side) = UnixStream::pair().unwrap();
        let task = tokio::spawn(Server::handle_client(
            server_side,
            controller.handle(),
            Instant::now(),
        ));

        assert_eq!(request(&mut client, &Request::Ping).await, Response::Pong);

        write_frame(&mut client, &serde_json::json!({"type": "dance"})).await.unwrap();
        let body = read_frame(&mut client).await.unwrap().unwrap();
        let response: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(response, Response::Error { code, .. } if code == "bad_request"));

        assert_eq!(request(&mut client, &Request::Subscribe).await, Response::Subscribed);

        event_tx.send(VoiceEvent::SpeakingStarted).unwrap();
        let body = read_frame(&mut client).await.unwrap().unwrap();
        let push: Push = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            push,
            Push::Event {
                event: VoiceEvent::SpeakingStarted
            }
        );

        drop(client);
        task.await.unwrap().unwrap();
    }
}
