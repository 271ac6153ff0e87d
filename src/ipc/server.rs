//! Unix domain socket server for the host surface
//!
//! Accepts request-response traffic, forwards button lifecycle events into
//! the reconciler, and pushes rendered icons to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::adapters::AdapterRegistry;
use crate::events::{DisplayUpdate, SurfaceEvent};

use super::protocol::{DaemonStatus, Notification, Request, Response};

const MAX_FRAME_LEN: usize = 1024 * 1024;

/// IPC server handling host-surface connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: ClientContext,
    shutdown_tx: broadcast::Sender<()>,
}

/// Everything a client handler needs, cheap to clone per connection
#[derive(Clone)]
struct ClientContext {
    event_tx: mpsc::Sender<SurfaceEvent>,
    display_tx: broadcast::Sender<DisplayUpdate>,
    registry: Arc<AdapterRegistry>,
    started_at: Instant,
}

impl Server {
    /// Create a new IPC server bound to the given socket path.
    pub fn new(
        socket_path: &Path,
        event_tx: mpsc::Sender<SurfaceEvent>,
        display_tx: broadcast::Sender<DisplayUpdate>,
        registry: Arc<AdapterRegistry>,
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

        // Socket permissions owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context: ClientContext {
                event_tx,
                display_tx,
                registry,
                started_at: Instant::now(),
            },
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = self.context.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
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

    /// Handle a single client connection.
    async fn handle_client(stream: UnixStream, context: ClientContext) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Single writer task keeps responses and notifications from
        // interleaving mid-frame
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(64);
        let write_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if writer.write_all(&frame).await.is_err() {
                    break;
                }
            }
        });

        let subscribed = Arc::new(AtomicBool::new(false));

        // Forward rendered icons to this client once it subscribes
        let forward_task = tokio::spawn({
            let out_tx = out_tx.clone();
            let subscribed = Arc::clone(&subscribed);
            let mut display_rx = context.display_tx.subscribe();
            async move {
                loop {
                    match display_rx.recv().await {
                        Ok(update) => {
                            if !subscribed.load(Ordering::SeqCst) {
                                continue;
                            }
                            let Ok(frame) = encode_frame(&Notification::SetImage(update)) else {
                                continue;
                            };
                            if out_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "display update receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        let result = Self::read_loop(&mut reader, &out_tx, &context, &subscribed).await;

        forward_task.abort();
        drop(out_tx);
        let _ = write_task.await;
        result
    }

    /// Read and answer length-prefixed requests until the client hangs up.
    async fn read_loop(
        reader: &mut OwnedReadHalf,
        out_tx: &mpsc::Sender<Vec<u8>>,
        context: &ClientContext,
        subscribed: &AtomicBool,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let response = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => {
                    debug!(?request, "received request");
                    Self::process_request(request, context, subscribed).await
                }
                Err(e) => Response::Error {
                    code: "bad_request".to_string(),
                    message: e.to_string(),
                },
            };

            out_tx
                .send(encode_frame(&response)?)
                .await
                .map_err(|_| anyhow!("client writer closed"))?;
        }
    }

    /// Process a request and return its response.
    async fn process_request(
        request: Request,
        context: &ClientContext,
        subscribed: &AtomicBool,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(DaemonStatus {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: context.started_at.elapsed().as_secs(),
                adapters: context.registry.list(),
            }),

            Request::Subscribe => {
                subscribed.store(true, Ordering::SeqCst);
                debug!("client subscribed to icon notifications");
                Response::Subscribed
            }

            Request::Event { event } => {
                if context.event_tx.send(event).await.is_err() {
                    Response::Error {
                        code: "shutting_down".to_string(),
                        message: "reconciler is no longer accepting events".to_string(),
                    }
                } else {
                    Response::Ack
                }
            }
        }
    }

    /// Gracefully shutdown the server.
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

/// Encode a message as a 4-byte-LE-length-prefixed JSON frame.
fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_round_trip() {
        let frame = encode_frame(&Response::Pong).unwrap();

        let len = u32::from_le_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(len, frame.len() - 4);

        let decoded: Response = serde_json::from_slice(&frame[4..]).unwrap();
        assert!(matches!(decoded, Response::Pong));
    }
}
