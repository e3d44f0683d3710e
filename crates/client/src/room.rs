//! The public facade (§3 `Room`): owns one [`SignalingEngine`] and one
//! [`MediaSessionController`], plus the set of local tracks and the
//! participant → remote-tracks mapping implied by them.
//!
//! Grounded on `original_source/include/LiveKitRoom.h`/`LiveKitService.h`:
//! a thin object that wires one `SignalClient` to one media
//! controller and exposes `connect`/`disconnect`/publish-ish methods —
//! this is additive detail under the already-named `Room` entity
//! (SPEC_FULL.md §1), not a new module.

use std::sync::Arc;

use nova_protocol::{ClientInfo, ConnectionParams, EncryptionMode, LeaveReason, TrackKind, TrackSource};

use crate::controller::MediaSessionController;
use crate::engine::listener::{EventQueue, EventQueueHandle};
use crate::engine::SignalingEngine;
use crate::error::ClientError;
use crate::platform::{
    DefaultSystemInfo, DefaultUuidGenerator, MediaEngine, SystemInfo, Transport, UuidGenerator,
};
use crate::track::{Track, TrackId};

/// Library version advertised on the wire (§6 "version"), read from
/// the crate's own Cargo metadata at build time.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds [`ConnectionParams`]/[`ClientInfo`] before a connect (§0.4).
/// There is no file-backed config in a client SDK, so this is a plain
/// builder rather than a deserialized struct.
pub struct ConnectOptions {
    pub host: String,
    pub auth_token: String,
    pub auto_subscribe: bool,
    pub adaptive_stream: bool,
    pub encryption: EncryptionMode,
}

impl ConnectOptions {
    #[must_use]
    pub fn new(host: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth_token: auth_token.into(),
            auto_subscribe: true,
            adaptive_stream: false,
            encryption: EncryptionMode::None,
        }
    }

    #[must_use]
    pub fn with_auto_subscribe(mut self, value: bool) -> Self {
        self.auto_subscribe = value;
        self
    }

    #[must_use]
    pub fn with_adaptive_stream(mut self, value: bool) -> Self {
        self.adaptive_stream = value;
        self
    }

    #[must_use]
    pub fn with_encryption(mut self, mode: EncryptionMode) -> Self {
        self.encryption = mode;
        self
    }
}

/// §3 `Room`: "from `connect()` to `disconnect()` terminal".
pub struct Room {
    engine: Arc<SignalingEngine>,
    controller: Arc<MediaSessionController>,
    // Keeps the event task alive for the room's lifetime; the queue
    // itself is cloned into `engine`/`controller`.
    _event_queue: EventQueueHandle,
    // The controller registers itself as a transport/server listener;
    // these hold the strong reference the weak registrations need to
    // stay alive.
    _self_listener_guard: Arc<MediaSessionController>,
}

impl Room {
    /// Wires a fresh `Room` around the given collaborators (§6). Host
    /// applications normally use [`Room::connect`] instead, which
    /// fills in [`DefaultSystemInfo`]/[`DefaultUuidGenerator`] and a
    /// `WsTransport`.
    #[must_use]
    pub fn with_collaborators(
        options: ConnectOptions,
        transport: Arc<dyn Transport>,
        media: Arc<dyn MediaEngine>,
        uuid_gen: Arc<dyn UuidGenerator>,
        system_info: Arc<dyn SystemInfo>,
    ) -> Self {
        let params = ConnectionParams::new(options.host, options.auth_token)
            .with_auto_subscribe(options.auto_subscribe)
            .with_adaptive_stream(options.adaptive_stream);
        let client_info = ClientInfo::new(
            LIBRARY_VERSION,
            system_info.os_name(),
            system_info.os_version(),
            system_info.device_model(),
            system_info.network_type(),
        );

        let (queue, event_queue_handle) = EventQueue::spawn();
        let engine = Arc::new(SignalingEngine::new(transport, params, client_info, queue.clone()));
        let controller =
            MediaSessionController::new(engine.clone(), media, uuid_gen, queue, options.encryption);

        let transport_listener: Arc<dyn crate::engine::listeners::TransportListener> =
            controller.clone();
        engine.add_transport_listener(Arc::downgrade(&transport_listener));
        let server_listener: Arc<dyn crate::engine::listeners::ServerListener> = controller.clone();
        engine.add_server_listener(Arc::downgrade(&server_listener));

        Self {
            engine,
            controller: controller.clone(),
            _event_queue: event_queue_handle,
            _self_listener_guard: controller,
        }
    }

    /// Convenience constructor wiring the default [`crate::transport::WsTransport`],
    /// [`DefaultSystemInfo`], and [`DefaultUuidGenerator`]. The media
    /// engine collaborator has no default implementation in this crate
    /// (§1 Non-goals), so the caller must supply one.
    #[must_use]
    pub fn new(options: ConnectOptions, media: Arc<dyn MediaEngine>) -> Self {
        Self::with_collaborators(
            options,
            crate::transport::default_transport(),
            media,
            Arc::new(DefaultUuidGenerator),
            Arc::new(DefaultSystemInfo),
        )
    }

    /// §4.2 `connect()`.
    pub async fn connect(&self) -> bool {
        self.engine.connect().await
    }

    /// §4.2 `disconnect()`.
    pub async fn disconnect(&self) {
        self.engine.disconnect().await
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<SignalingEngine> {
        &self.engine
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<MediaSessionController> {
        &self.controller
    }

    /// Creates and publishes a local track in one call (§4.3 publish
    /// path).
    pub async fn publish(
        &self,
        name: impl Into<String>,
        kind: TrackKind,
        source: TrackSource,
    ) -> Result<TrackId, ClientError> {
        let track = self.controller.create_local_track(name, kind, source);
        self.controller.publish(track).await
    }

    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<Track> {
        self.controller.track(id)
    }

    /// §8 scenario 6: graceful leave.
    pub async fn leave(&self, reason: LeaveReason, can_reconnect: bool) {
        self.controller.leave(reason, can_reconnect).await;
    }
}
