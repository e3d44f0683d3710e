//! Command transport (§2, §6 "WebSocket transport"): the sole
//! concrete [`crate::platform::Transport`] implementation, wrapping
//! `tokio-tungstenite`.
//!
//! A split sink/stream pair plus a background read loop feeding
//! inbound events onto a channel: binary and text frames per §6's
//! transport contract.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::engine::state::TransportState;
use crate::error::TransportError;
use crate::platform::{Transport, TransportEvent};

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// WebSocket-backed [`Transport`]. Holds the live sink behind a mutex
/// so `send_binary`/`send_text` can be called concurrently with the
/// background read loop; there is exactly one connection attempt in
/// flight at a time (`open` is only ever called while the signaling
/// engine is in `Connecting`).
pub struct WsTransport {
    sink: Mutex<Option<WsSink>>,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WsTransport {
    #[must_use]
    pub fn new() -> Self {
        Self { sink: Mutex::new(None) }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(
        &self,
        url: url::Url,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        info!(%url, "opening signaling transport");
        let _ = events.send(TransportEvent::StateChanged(TransportState::Connecting));

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|err| {
                warn!(error = %err, "signaling transport failed to connect");
                let _ = events.send(TransportEvent::StateChanged(TransportState::Disconnected));
                TransportError::General(err.to_string())
            })?;

        let (sink, mut stream_rx) = stream.split();
        *self.sink.lock().await = Some(sink);
        let _ = events.send(TransportEvent::StateChanged(TransportState::Connected));

        tokio::spawn(async move {
            loop {
                match stream_rx.next().await {
                    Some(Ok(Message::Binary(bytes))) => {
                        debug!(len = bytes.len(), "inbound binary frame");
                        let _ = events.send(TransportEvent::BinaryMessage(bytes.to_vec()));
                    }
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(TransportEvent::TextMessage(text.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = events
                            .send(TransportEvent::StateChanged(TransportState::Disconnecting));
                        let _ = events
                            .send(TransportEvent::StateChanged(TransportState::Disconnected));
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "signaling transport read error");
                        let _ = events.send(TransportEvent::Error(TransportError::General(
                            err.to_string(),
                        )));
                        let _ = events
                            .send(TransportEvent::StateChanged(TransportState::Disconnected));
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }
    }

    async fn send_binary(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => sink
                .send(Message::Binary(frame.into()))
                .await
                .map_err(|_| TransportError::WriteBinary),
            None => Err(TransportError::NoConnection),
        }
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                sink.send(Message::Text(text.into())).await.map_err(|_| TransportError::WriteText)
            }
            None => Err(TransportError::NoConnection),
        }
    }
}

/// Convenience constructor used by [`crate::room::Room::new`]'s
/// default wiring.
#[must_use]
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::new(WsTransport::new())
}
