//! Media engine collaborator (§6, §9's redesign note on platform
//! codec dispatch: trait-only here, no RTP/SRTP/codec stack per §1's
//! Non-goals).
//!
//! `MediaEngine` mints `PeerHandle`s; calls into a handle that mutate
//! peer-connection state are `async fn`s (marshalled onto whatever
//! thread the implementation owns, per §5); events the implementation
//! observes (an ICE candidate gathered, a receiver appearing, the ICE
//! connection state changing) are pushed onto the channel handed to
//! [`MediaEngine::create_peer_connection`] so the controller can
//! funnel them onto its single event task queue alongside transport
//! and signaling events, exactly as §5 describes for "media-engine
//! threads".

use async_trait::async_trait;

use nova_protocol::{Cid, SessionDescription, TrickleTarget};

use crate::error::ClientError;

/// Local/remote media kind a sender or receiver carries (§3 `TrackKind`
/// restated at the collaborator seam, since the engine never imports
/// wire types directly into its own API surface beyond this).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Opaque ICE server descriptor handed to [`MediaEngine::create_peer_connection`],
/// mirroring [`nova_protocol::IceServerInfo`] without requiring the
/// media engine collaborator to depend on `nova-protocol` itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Configuration passed to [`MediaEngine::create_peer_connection`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PeerConnectionConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

/// Events the media engine collaborator reports back, funneled onto
/// the controller's event task queue (§5, §6 "callbacks").
#[derive(Clone, Debug, PartialEq)]
pub enum PeerEvent {
    /// An ICE candidate was gathered locally and needs to be trickled
    /// to the server (§3 `TrickleRequest`).
    IceCandidate { candidate: String, target: TrickleTarget },
    /// An inbound receiver appeared. `remote_id` is the SFU-assigned
    /// SID the receiver carries on the wire; the subscribe path (§4.3)
    /// matches this against a pending or already-known `TrackInfo`.
    ReceiverAdded { remote_id: String, kind: MediaKind },
    /// The peer connection's own ICE/connection state changed.
    ConnectionStateChanged(PeerConnectionState),
}

/// Connection state surfaced by the peer connection, independent of
/// the signaling transport's own [`crate::engine::state::TransportState`]
/// (§6 callback `on_connection_state_changed`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A sender or receiver handle bound to one local `CID` or remote SID.
/// The controller never inspects this beyond its id; it exists so
/// `unbind`/teardown has something concrete to release (§4.3 "the
/// sender binding is dropped").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaHandleId(pub String);

/// One peer connection (§6 "handle"). Every state-mutating call is
/// `async` per §5's marshalling rule; the controller awaits each one
/// before proceeding, which is what gives publish step 2 → step 3 its
/// ordering guarantee.
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait]
pub trait PeerHandle: Send + Sync {
    /// Adds a local track as an outbound sender. The returned handle's
    /// id MUST equal `local_id` (§4.3 invariant), which is why this
    /// signature hands the id back rather than minting a new one.
    async fn add_track(
        &self,
        kind: MediaKind,
        local_id: &Cid,
    ) -> Result<MediaHandleId, ClientError>;

    /// Removes a previously added sender.
    async fn remove_track(&self, sender_id: &MediaHandleId) -> Result<(), ClientError>;

    async fn create_offer(&self) -> Result<SessionDescription, ClientError>;

    async fn create_answer(&self) -> Result<SessionDescription, ClientError>;

    async fn set_local_description(&self, sdp: SessionDescription) -> Result<(), ClientError>;

    async fn set_remote_description(&self, sdp: SessionDescription) -> Result<(), ClientError>;

    /// Hands the collaborator a remote trickle candidate to apply.
    async fn add_ice_candidate(&self, candidate: String) -> Result<(), ClientError>;
}

/// Mints [`PeerHandle`]s (§6 "create_peer_connection(config) → handle").
#[cfg_attr(feature = "mockable", mockall::automock)]
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn create_peer_connection(
        &self,
        config: PeerConnectionConfig,
        events: tokio::sync::mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<std::sync::Arc<dyn PeerHandle>, ClientError>;
}
