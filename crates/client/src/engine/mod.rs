//! Signaling engine (§2, §4.2): URL assembly, transport state machine,
//! request fan-out, response demultiplexing, listener registration,
//! ping/pong keepalive.

pub mod listener;
pub mod listeners;
pub mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use nova_protocol::{
    codec, url::build_signaling_url, ClientInfo, ConnectionParams, LeaveRequest, Ping,
    SignalRequest, SignalResponse,
};

use crate::engine::listener::{EventQueue, ListenerRegistry};
use crate::engine::listeners::{ServerListener, TransportListener};
use crate::engine::state::TransportState;
use crate::error::TransportError;
use crate::platform::{Transport, TransportEvent};

/// Owns the transport state machine and drives the wire protocol.
/// Co-terminus with a `Room` (§3).
pub struct SignalingEngine {
    transport: Arc<dyn Transport>,
    state: Arc<RwLock<TransportState>>,
    params: RwLock<ConnectionParams>,
    client_info: ClientInfo,
    transport_listeners: Arc<ListenerRegistry<dyn TransportListener>>,
    server_listeners: Arc<ListenerRegistry<dyn ServerListener>>,
    queue: EventQueue,
}

impl SignalingEngine {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        params: ConnectionParams,
        client_info: ClientInfo,
        queue: EventQueue,
    ) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(TransportState::Disconnected)),
            params: RwLock::new(params),
            client_info,
            transport_listeners: Arc::new(ListenerRegistry::new()),
            server_listeners: Arc::new(ListenerRegistry::new()),
            queue,
        }
    }

    /// Current transport state snapshot (§5: "Cross-thread reads are
    /// allowed via snapshots").
    pub async fn state(&self) -> TransportState {
        *self.state.read().await
    }

    pub fn add_transport_listener(&self, listener: std::sync::Weak<dyn TransportListener>) {
        self.transport_listeners.add(listener);
    }

    pub fn remove_transport_listener(&self, listener: &std::sync::Weak<dyn TransportListener>) {
        self.transport_listeners.remove(listener);
    }

    pub fn add_server_listener(&self, listener: std::sync::Weak<dyn ServerListener>) {
        self.server_listeners.add(listener);
    }

    pub fn remove_server_listener(&self, listener: &std::sync::Weak<dyn ServerListener>) {
        self.server_listeners.remove(listener);
    }

    /// Current connection parameters snapshot.
    pub async fn params(&self) -> ConnectionParams {
        self.params.read().await.clone()
    }

    /// Mutates connection parameters while disconnected (§3: "mutable
    /// only while disconnected"). Mutation while connected is
    /// permitted by §5 but never re-drives the in-flight connection;
    /// callers normally only do this between sessions.
    pub async fn set_params(&self, params: ConnectionParams) {
        *self.params.write().await = params;
    }

    /// Attempts the transition and, if legal, posts the notification
    /// onto the event queue (§4.2: "State transitions are observable
    /// to listeners in the order they occur; listeners are invoked on
    /// the event task queue, never on the transport's own callback
    /// thread.").
    async fn transition(&self, next: TransportState) -> bool {
        let mut guard = self.state.write().await;
        if !guard.can_transition_to(next) {
            warn!(from = ?*guard, to = ?next, "rejected illegal transport state transition");
            return false;
        }
        let changed = *guard != next;
        *guard = next;
        drop(guard);
        if changed {
            info!(to = ?next, "transport state changed");
            let listeners = self.transport_listeners.clone();
            self.queue.post(move || {
                for l in listeners.snapshot() {
                    l.on_state_changed(next);
                }
            });
        }
        true
    }

    /// §4.2 `connect()`. Preconditions: host/token non-empty, state
    /// `Disconnected`. Returns immediately; completion is reported via
    /// a later transition to `Connected` or `Disconnected`.
    pub async fn connect(&self) -> bool {
        let params = self.params.read().await.clone();
        if !params.is_valid() {
            warn!("connect() rejected: invalid connection params");
            return false;
        }
        if self.state().await != TransportState::Disconnected {
            warn!("connect() rejected: not in Disconnected state");
            return false;
        }
        let url = match build_signaling_url(&params, &self.client_info) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "failed to assemble signaling URL");
                return false;
            }
        };

        if !self.transition(TransportState::Connecting).await {
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel::<TransportEvent>();
        let transport = self.transport.clone();
        let open_result = transport.open(url, tx).await;
        if let Err(err) = open_result {
            self.report_transport_error(err).await;
            self.transition(TransportState::Disconnected).await;
            return false;
        }

        self.spawn_event_pump(rx);
        true
    }

    /// §4.2 `disconnect()`. Idempotent from any state but `Disconnected`.
    pub async fn disconnect(&self) {
        let current = self.state().await;
        if current == TransportState::Disconnected {
            return;
        }
        self.transition(TransportState::Disconnecting).await;
        self.transport.close().await;
        self.transition(TransportState::Disconnected).await;
    }

    /// Drains transport events: decodes binary frames into
    /// `SignalResponse`s and dispatches them in wire order (§4.2, §5).
    fn spawn_event_pump(&self, mut rx: mpsc::UnboundedReceiver<TransportEvent>) {
        let server_listeners = self.server_listeners.clone();
        let transport_listeners = self.transport_listeners.clone();
        let queue = self.queue.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    TransportEvent::StateChanged(next) => {
                        let mut guard = state.write().await;
                        if guard.can_transition_to(next) {
                            let changed = *guard != next;
                            *guard = next;
                            drop(guard);
                            if changed {
                                let listeners = transport_listeners.clone();
                                queue.post(move || {
                                    for l in listeners.snapshot() {
                                        l.on_state_changed(next);
                                    }
                                });
                            }
                        }
                    }
                    TransportEvent::BinaryMessage(bytes) => {
                        dispatch_frame(&bytes, &server_listeners, &transport_listeners, &queue);
                    }
                    TransportEvent::TextMessage(text) => {
                        debug!(len = text.len(), "ignoring unexpected text frame");
                    }
                    TransportEvent::Error(err) => {
                        let fatal = err.is_fatal();
                        let listeners = transport_listeners.clone();
                        queue.post(move || {
                            for l in listeners.snapshot() {
                                l.on_transport_error(err.clone());
                            }
                        });
                        if fatal {
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn report_transport_error(&self, err: TransportError) {
        let listeners = self.transport_listeners.clone();
        self.queue.post(move || {
            for l in listeners.snapshot() {
                l.on_transport_error(err.clone());
            }
        });
    }

    /// Hands a request to the transport iff connected (§4.2 `send_<request>`).
    /// Does not await a server ack.
    pub async fn send(&self, request: SignalRequest) -> bool {
        if self.state().await != TransportState::Connected {
            return false;
        }
        if !request.requires_protocol(self.client_info.protocol) {
            warn!(request = ?request, "dropping request gated by protocol revision");
            return false;
        }
        let frame = codec::encode_request(&request);
        match self.transport.send_binary(frame).await {
            Ok(()) => true,
            Err(err) => {
                self.report_transport_error(err).await;
                false
            }
        }
    }

    /// §4.2 keepalive: answers a server `Ping` or an app-initiated
    /// `ping()` call with a `Pong` echoing the server's timestamp.
    pub async fn ping(&self, now_ms: u64) -> bool {
        self.send(SignalRequest::PingReq(Ping { timestamp_ms: now_ms })).await
    }

    pub async fn send_leave(&self, request: LeaveRequest) -> bool {
        self.send(SignalRequest::Leave(request)).await
    }
}

/// Decodes one inbound frame and fans it out to the right listener
/// method, or reports a decode failure without tearing the connection
/// down (§4.2, §7 `DecodeError`).
fn dispatch_frame(
    frame: &[u8],
    server_listeners: &Arc<ListenerRegistry<dyn ServerListener>>,
    transport_listeners: &Arc<ListenerRegistry<dyn TransportListener>>,
    queue: &EventQueue,
) {
    match codec::decode_response(frame) {
        Ok(codec::Decoded::Value(response)) => {
            debug!(kind = response.kind_name(), "dispatching server response");
            let listeners = server_listeners.clone();
            queue.post(move || dispatch_response(response, &listeners));
        }
        Ok(codec::Decoded::UnknownVariant(tag)) => {
            debug!(tag, "dropping frame with unrecognized variant tag");
        }
        Err(err) => {
            warn!(error = %err, "failed to decode server response");
            let listeners = transport_listeners.clone();
            queue.post(move || {
                for l in listeners.snapshot() {
                    l.on_server_response_parse_error(&err);
                }
            });
        }
    }
}

fn dispatch_response(response: SignalResponse, listeners: &ListenerRegistry<dyn ServerListener>) {
    let snapshot = listeners.snapshot();
    match response {
        SignalResponse::Join(r) => {
            for l in &snapshot {
                l.on_join(r.clone());
            }
        }
        SignalResponse::Offer(sdp) => {
            for l in &snapshot {
                l.on_offer(sdp.clone());
            }
        }
        SignalResponse::Answer(sdp) => {
            for l in &snapshot {
                l.on_answer(sdp.clone());
            }
        }
        SignalResponse::Trickle(t) => {
            for l in &snapshot {
                l.on_trickle(t.clone());
            }
        }
        SignalResponse::Update(u) => {
            for l in &snapshot {
                l.on_participant_update(u.clone());
            }
        }
        SignalResponse::TrackPublished(r) => {
            for l in &snapshot {
                l.on_track_published(r.clone());
            }
        }
        SignalResponse::TrackUnpublished(r) => {
            for l in &snapshot {
                l.on_track_unpublished(r.clone());
            }
        }
        SignalResponse::Leave(r) => {
            for l in &snapshot {
                l.on_leave(r);
            }
        }
        SignalResponse::Mute(r) => {
            for l in &snapshot {
                l.on_mute(r.clone());
            }
        }
        SignalResponse::SpeakersChanged { speakers } => {
            for l in &snapshot {
                l.on_speakers_changed(speakers.clone());
            }
        }
        SignalResponse::RoomUpdate { metadata } => {
            for l in &snapshot {
                l.on_room_update(metadata.clone());
            }
        }
        SignalResponse::ConnectionQuality { updates } => {
            for l in &snapshot {
                l.on_connection_quality(updates.clone());
            }
        }
        SignalResponse::StreamStateUpdate(u) => {
            for l in &snapshot {
                l.on_stream_state_update(u.clone());
            }
        }
        SignalResponse::SubscribedQualityUpdate { track_sid, layer } => {
            for l in &snapshot {
                l.on_subscribed_quality_update(track_sid.clone(), layer);
            }
        }
        SignalResponse::SubscriptionPermissionUpdate { track_sid, allowed } => {
            for l in &snapshot {
                l.on_subscription_permission_update(track_sid.clone(), allowed);
            }
        }
        SignalResponse::RefreshToken { token } => {
            for l in &snapshot {
                l.on_refresh_token(token.clone());
            }
        }
        SignalResponse::Pong(p) => {
            for l in &snapshot {
                l.on_pong(p);
            }
        }
        SignalResponse::ReconnectResponse { ice_servers } => {
            for l in &snapshot {
                l.on_reconnect_response(ice_servers.clone());
            }
        }
        SignalResponse::SubscriptionResponse { track_sid, allowed } => {
            for l in &snapshot {
                l.on_subscription_response(track_sid.clone(), allowed);
            }
        }
        SignalResponse::RequestResponse { request_id, accepted, message } => {
            for l in &snapshot {
                l.on_request_response(request_id, accepted, message.clone());
            }
        }
        SignalResponse::TrackSubscribed { track_sid } => {
            for l in &snapshot {
                l.on_track_subscribed(track_sid.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use nova_protocol::{JoinResponse, ParticipantSid, Pong, RoomSid, SignalResponse};

    use super::*;

    struct Counters {
        joins: AtomicUsize,
        pongs: AtomicUsize,
        parse_errors: AtomicUsize,
    }

    impl Counters {
        fn new() -> Self {
            Self {
                joins: AtomicUsize::new(0),
                pongs: AtomicUsize::new(0),
                parse_errors: AtomicUsize::new(0),
            }
        }
    }

    impl ServerListener for Counters {
        fn on_join(&self, _response: JoinResponse) {
            self.joins.fetch_add(1, Ordering::SeqCst);
        }
        fn on_pong(&self, _pong: Pong) {
            self.pongs.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl TransportListener for Counters {
        fn on_server_response_parse_error(&self, _err: &nova_protocol::DecodeError) {
            self.parse_errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_join() -> JoinResponse {
        JoinResponse {
            room_sid: RoomSid::from("R1".to_string()),
            room_name: "demo".into(),
            participant_sid: ParticipantSid::from("P1".to_string()),
            other_participants: vec![],
            ice_servers: vec![],
            server_region: "local".into(),
        }
    }

    fn test_engine() -> (
        Arc<ListenerRegistry<dyn ServerListener>>,
        Arc<ListenerRegistry<dyn TransportListener>>,
        EventQueue,
        EventQueueHandle,
    ) {
        let (queue, handle) = EventQueue::spawn();
        (Arc::new(ListenerRegistry::new()), Arc::new(ListenerRegistry::new()), queue, handle)
    }

    /// §8 scenario 1 (the dispatch half): a decoded `Join` frame
    /// notifies `on_join` exactly once.
    #[tokio::test]
    async fn join_frame_dispatches_exactly_once() {
        let (server_listeners, transport_listeners, queue, _handle) = test_engine();
        let counters = Arc::new(Counters::new());
        let server: Arc<dyn ServerListener> = counters.clone();
        server_listeners.add(Arc::downgrade(&server));

        let frame = codec::encode_response(&SignalResponse::Join(sample_join()));
        dispatch_frame(&frame, &server_listeners, &transport_listeners, &queue);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(counters.joins.load(Ordering::SeqCst), 1);
    }

    /// §8 scenario 5: an unknown variant tag is dropped silently (§4.1)
    /// rather than reported as a parse error — it names a variant a
    /// newer protocol revision introduced, not a malformed frame.
    #[tokio::test]
    async fn unknown_variant_tag_is_dropped_without_notifying_listeners() {
        let (server_listeners, transport_listeners, queue, _handle) = test_engine();
        let counters = Arc::new(Counters::new());
        let server: Arc<dyn ServerListener> = counters.clone();
        let transport: Arc<dyn TransportListener> = counters.clone();
        server_listeners.add(Arc::downgrade(&server));
        transport_listeners.add(Arc::downgrade(&transport));

        let mut frame = Vec::new();
        let tag: u32 = 9_999;
        let payload = tag.to_le_bytes();
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);

        dispatch_frame(&frame, &server_listeners, &transport_listeners, &queue);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(counters.joins.load(Ordering::SeqCst), 0);
        assert_eq!(counters.parse_errors.load(Ordering::SeqCst), 0);
    }

    /// §8 scenario 5: a genuinely malformed frame notifies
    /// `on_server_response_parse_error` once and does not prevent a
    /// subsequent well-formed frame from dispatching normally.
    #[tokio::test]
    async fn malformed_frame_reports_parse_error_and_does_not_wedge_the_pump() {
        let (server_listeners, transport_listeners, queue, _handle) = test_engine();
        let counters = Arc::new(Counters::new());
        let server: Arc<dyn ServerListener> = counters.clone();
        let transport: Arc<dyn TransportListener> = counters.clone();
        server_listeners.add(Arc::downgrade(&server));
        transport_listeners.add(Arc::downgrade(&transport));

        // A recognized tag (Join = 0) with a truncated body.
        let mut bad = Vec::new();
        bad.extend_from_slice(&4u32.to_le_bytes());
        bad.extend_from_slice(&0u32.to_le_bytes());
        dispatch_frame(&bad, &server_listeners, &transport_listeners, &queue);

        let pong = Pong { last_ping_timestamp_ms: 1, timestamp_ms: 2 };
        let good = codec::encode_response(&SignalResponse::Pong(pong));
        dispatch_frame(&good, &server_listeners, &transport_listeners, &queue);

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(counters.parse_errors.load(Ordering::SeqCst), 1);
        assert_eq!(counters.pongs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transition_to_illegal_state_is_rejected() {
        let transport: Arc<dyn Transport> = crate::transport::default_transport();
        let (queue, _handle) = EventQueue::spawn();
        let engine = SignalingEngine::new(
            transport,
            ConnectionParams::new("wss://sfu.example/", "T"),
            ClientInfo::new("1.0.0", "linux", "1", "pc", "wired"),
            queue,
        );
        assert_eq!(engine.state().await, TransportState::Disconnected);
        assert!(!engine.transition(TransportState::Connected).await);
        assert_eq!(engine.state().await, TransportState::Disconnected);
    }
}
