//! Collaborator interfaces (§6 "Collaborator interfaces consumed").
//!
//! Everything in this module is a seam: the SDK core depends only on
//! these traits, never on a concrete transport or media engine, per
//! §1's Non-goals (the real-time media engine and the WebSocket
//! implementation live outside the core). [`Transport`] has exactly
//! one concrete implementation in this crate, [`crate::transport::WsTransport`];
//! [`MediaEngine`]/[`PeerHandle`] are trait-only here.

mod media;
mod sysinfo;
mod uuid_gen;

pub use media::{
    IceServerConfig, MediaEngine, MediaHandleId, MediaKind, PeerConnectionConfig,
    PeerConnectionState, PeerEvent, PeerHandle,
};
pub use sysinfo::{DefaultSystemInfo, SystemInfo};
pub use uuid_gen::{DefaultUuidGenerator, UuidGenerator};

#[cfg(feature = "mockable")]
pub use media::{MockMediaEngine, MockPeerHandle};

use async_trait::async_trait;

use crate::error::TransportError;

/// Transport-level connection state the collaborator reports back
/// (§6: "State set = {Connecting, Connected, Disconnecting, Disconnected}").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    StateChanged(crate::engine::state::TransportState),
    BinaryMessage(Vec<u8>),
    TextMessage(String),
    Error(TransportError),
}

/// The WebSocket command transport collaborator (§2, §6).
///
/// Minimal capability exposed downward to the signaling engine: send
/// one binary frame, send one text frame, receive a stream of either.
/// Implementations push [`TransportEvent`]s onto the channel handed to
/// [`Transport::open`] rather than exposing synchronous callbacks, so
/// the signaling engine can marshal them onto the event task queue
/// uniformly with every other event source (§5).
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begins connecting to `url`, pushing [`TransportEvent`]s onto
    /// `events` as they occur. Returns once the connection attempt has
    /// been *initiated*, not once it completes (§4.2: "asynchronous
    /// completion is reported via state transition").
    async fn open(
        &self,
        url: url::Url,
        events: tokio::sync::mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError>;

    /// Closes the transport. Idempotent.
    async fn close(&self);

    async fn send_binary(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    async fn send_text(&self, text: String) -> Result<(), TransportError>;
}
