//! WebSocket adapter
//!
//! The app's default transport. Text frames carry telemetry JSON, binary
//! frames carry camera and depth envelopes. Each TCP peer is one connection,
//! identified by its `host:port`.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{Adapter, Protocol, advertised_host};
use crate::config::ServerConfig;
use crate::decode::InboundFrame;
use crate::dispatch::Dispatcher;
use crate::types::ConnectionId;
use crate::{ArvosError, Result};

/// Serves the app over WebSocket and feeds a [`Dispatcher`].
pub struct WebSocketAdapter {
    config: ServerConfig,
    dispatcher: Dispatcher,
    running: Option<Running>,
}

struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl std::fmt::Debug for WebSocketAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketAdapter")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl WebSocketAdapter {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher, running: None }
    }

    /// Address the listener is bound to, once started.
    ///
    /// Differs from the configured port when the configuration asked for
    /// port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    async fn accept_loop(listener: TcpListener, dispatcher: Dispatcher, cancel: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("WebSocket accept loop cancelled");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let dispatcher = dispatcher.clone();
                    let cancel = cancel.child_token();
                    tokio::spawn(async move {
                        Self::serve_client(stream, peer, dispatcher, cancel).await;
                    });
                }
                Err(e) => {
                    // Accept errors (e.g. too many open files) are per-attempt.
                    warn!("Failed to accept WebSocket client: {}", e);
                }
            }
        }
    }

    async fn serve_client(
        stream: TcpStream,
        peer: SocketAddr,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!("WebSocket handshake with {} failed: {}", peer, e);
                return;
            }
        };

        let id = ConnectionId::from(peer);
        dispatcher.connect(&id);

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                next = ws_rx.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.ingest(&id, InboundFrame::Text(text)).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    dispatcher.ingest(&id, InboundFrame::Binary(Bytes::from(data))).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                        debug!("Failed to answer ping from {}: {}", id, e);
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("WebSocket closed by client {}", id);
                    break;
                }
                Some(Ok(other)) => {
                    trace!("Ignoring WebSocket frame from {}: {:?}", id, other);
                }
                Some(Err(e)) => {
                    warn!("WebSocket error from {}: {}", id, e);
                    break;
                }
                None => break,
            }
        }

        dispatcher.disconnect(&id);
    }
}

#[async_trait::async_trait]
impl Adapter for WebSocketAdapter {
    async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            ArvosError::transport_with_source(
                self.protocol_name(),
                format!("failed to bind {}", address),
                Box::new(e),
            )
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            ArvosError::transport_with_source(self.protocol_name(), "listener has no address", Box::new(e))
        })?;

        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(Self::accept_loop(listener, self.dispatcher.clone(), cancel.clone()));

        self.running = Some(Running { local_addr, cancel, accept_task });
        info!("WebSocket adapter listening on {} ({})", local_addr, self.connection_url());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.cancel.cancel();
        if let Err(e) = running.accept_task.await {
            error!("WebSocket accept loop ended abnormally: {}", e);
        }
        info!("WebSocket adapter stopped");
        Ok(())
    }

    fn connection_url(&self) -> String {
        let port = self.local_addr().map(|addr| addr.port()).unwrap_or_else(|| self.config.port());
        Protocol::WebSocket.connection_url(&advertised_host(&self.config.host), port)
    }

    fn protocol_name(&self) -> &'static str {
        Protocol::WebSocket.name()
    }
}

impl Drop for WebSocketAdapter {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}
