//! Media session controller (§2, §4.3): the publish path, the
//! subscribe path, mute propagation, encryption-mode negotiation, and
//! reconnect policy. Consumes server messages from
//! [`crate::engine::SignalingEngine`] (by registering itself as a
//! [`ServerListener`]/[`TransportListener`]) and local publish/
//! subscribe intent from the application.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::{info, warn};

use nova_protocol::{
    AddTrackRequest, Cid, EncryptionMode, JoinResponse, LeaveReason, LeaveRequest,
    MuteTrackRequest, ParticipantSid, SessionDescription, Sid, SignalRequest, TrackInfo,
    TrackKind, TrackPublishedResponse, TrackSource, TrackUnpublishedResponse, TrickleRequest,
};

use crate::engine::listener::{EventQueue, ListenerRegistry};
use crate::engine::listeners::{ServerListener, TransportListener};
use crate::engine::state::TransportState;
use crate::engine::SignalingEngine;
use crate::error::{ClientError, ProtocolError, PublishError, TransportError};
use crate::platform::{
    MediaEngine, MediaHandleId, MediaKind, PeerConnectionConfig, PeerEvent, PeerHandle,
    UuidGenerator,
};
use crate::track::{Arena, LocalTrack, RemoteTrack, Track, TrackId};

/// Observes session-level events the controller raises (§4.3, §8).
#[allow(unused_variables)]
pub trait ControllerListener: Send + Sync {
    /// A local track was assigned its server SID (publish step 6).
    fn on_sid_changed(&self, cid: Cid, sid: Sid) {}
    /// The app's own `mute()` call on a local track was confirmed by
    /// the server's echo (§8 scenario 3).
    fn on_mute_changed(&self, sid: Sid, muted: bool) {}
    /// A mute change originated by something other than our own
    /// `mute()` call: a moderator muting our local track, or a remote
    /// track's mute state changing (§4.3).
    fn on_remote_side_mute_changed(&self, sid: Sid, muted: bool) {}
    fn on_remote_track_added(&self, track: RemoteTrack) {}
    fn on_remote_track_removed(&self, sid: Sid) {}
    fn on_publish_error(&self, cid: Cid, err: PublishError) {}
}

struct Inner {
    arena: Arena<Track>,
    cid_index: HashMap<Cid, TrackId>,
    sid_index: HashMap<Sid, TrackId>,
    /// Publishes awaiting a server ack, resolved by [`MediaSessionController::on_join`]
    /// or [`MediaSessionController::on_track_published`] (§4.3 step 5).
    pending_publishes: HashMap<Cid, oneshot::Sender<Result<Sid, PublishError>>>,
    /// Mutes this controller itself requested, awaiting the server's
    /// confirming echo (§8 scenario 3).
    pending_mutes: HashMap<Sid, bool>,
    /// `TrackInfo`s the server has announced but whose inbound receiver
    /// hasn't arrived yet (§4.3 "If the receiver arrives first...").
    pending_track_info: HashMap<Sid, TrackInfo>,
    /// Inbound receivers the media engine has already surfaced but
    /// whose `TrackInfo` hasn't arrived yet — the other half of the
    /// same race (§4.3 "the track is held in a pending map keyed by
    /// SID until `TrackInfo` arrives").
    pending_receivers: HashMap<Sid, MediaHandleId>,
    participant_sid: Option<ParticipantSid>,
}

impl Inner {
    fn new() -> Self {
        Self {
            arena: Arena::new(),
            cid_index: HashMap::new(),
            sid_index: HashMap::new(),
            pending_publishes: HashMap::new(),
            pending_mutes: HashMap::new(),
            pending_track_info: HashMap::new(),
            pending_receivers: HashMap::new(),
            participant_sid: None,
        }
    }
}

/// The media session controller (§4.3). Owns the track arena; every
/// mutation happens while holding `inner`'s lock, a single-writer
/// guarantee equivalent to §5's "mutated only from the event task
/// queue" — both give the same sequential-consistency property, and a
/// plain mutex reads more naturally from `async fn` call sites than
/// re-entering a hand-rolled queue for every field write.
pub struct MediaSessionController {
    /// Upgraded when a sync [`ServerListener`] callback (`on_offer`,
    /// `on_trickle`) needs to spawn async work against `self` that
    /// requires `Arc<Self>` (e.g. [`Self::publisher_peer`]).
    self_weak: Weak<Self>,
    engine: Arc<SignalingEngine>,
    media: Arc<dyn MediaEngine>,
    uuid_gen: Arc<dyn UuidGenerator>,
    queue: EventQueue,
    default_encryption: EncryptionMode,
    inner: StdMutex<Inner>,
    /// Cached publisher peer connection, created lazily on first
    /// publish (§6 "create_peer_connection(config) → handle").
    publisher_peer: AsyncMutex<Option<Arc<dyn PeerHandle>>>,
    listeners: ListenerRegistry<dyn ControllerListener>,
}

impl MediaSessionController {
    /// Builds the controller behind its own `Arc`, via `Arc::new_cyclic`,
    /// so it can hold a [`Weak`] reference to itself for sync listener
    /// callbacks that need to spawn `Arc<Self>`-bound async work.
    #[must_use]
    pub fn new(
        engine: Arc<SignalingEngine>,
        media: Arc<dyn MediaEngine>,
        uuid_gen: Arc<dyn UuidGenerator>,
        queue: EventQueue,
        default_encryption: EncryptionMode,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            engine,
            media,
            uuid_gen,
            queue,
            default_encryption,
            inner: StdMutex::new(Inner::new()),
            publisher_peer: AsyncMutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    pub fn add_listener(&self, listener: Weak<dyn ControllerListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Weak<dyn ControllerListener>) {
        self.listeners.remove(listener);
    }

    fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn ControllerListener) + Send + 'static,
    {
        let listeners = self.listeners.snapshot();
        self.queue.post(move || {
            for l in &listeners {
                f(l.as_ref());
            }
        });
    }

    /// Mints a fresh [`LocalTrack`] with a freshly-generated CID
    /// (§4.3 publish step 1), not yet published.
    #[must_use]
    pub fn create_local_track(
        &self,
        name: impl Into<String>,
        kind: TrackKind,
        source: TrackSource,
    ) -> LocalTrack {
        LocalTrack::new(self.uuid_gen.generate(), name, kind, source)
    }

    /// Returns the cached publisher peer connection, creating one on
    /// first use (§6). `self: &Arc<Self>` because the spawned pump
    /// task needs a handle back into the controller to forward
    /// [`PeerEvent`]s onto its event queue (§5 "media-engine threads").
    async fn publisher_peer(self: &Arc<Self>) -> Result<Arc<dyn PeerHandle>, ClientError> {
        let mut guard = self.publisher_peer.lock().await;
        if let Some(peer) = guard.as_ref() {
            return Ok(peer.clone());
        }
        let (tx, rx) = mpsc::unbounded_channel::<PeerEvent>();
        let peer =
            self.media.create_peer_connection(PeerConnectionConfig::default(), tx).await?;
        *guard = Some(peer.clone());
        drop(guard);
        self.spawn_peer_event_pump(rx);
        Ok(peer)
    }

    /// Funnels `PeerEvent`s (ICE candidates, receivers, connection
    /// state changes) from the media engine collaborator onto the
    /// same event task queue as every other event source (§5).
    fn spawn_peer_event_pump(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<PeerEvent>) {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    PeerEvent::IceCandidate { candidate, target } => {
                        controller
                            .engine
                            .send(SignalRequest::Trickle(TrickleRequest {
                                candidate,
                                target,
                                final_candidate: false,
                            }))
                            .await;
                    }
                    PeerEvent::ReceiverAdded { remote_id, .. } => {
                        let handle = MediaHandleId(remote_id.clone());
                        controller.on_receiver_added(remote_id, handle);
                    }
                    PeerEvent::ConnectionStateChanged(state) => {
                        info!(?state, "peer connection state changed");
                    }
                }
            }
        });
    }

    /// §4.3 publish path. Resolves once the server has acknowledged
    /// the track (assigned a SID) or the publish attempt fails.
    pub async fn publish(self: &Arc<Self>, mut track: LocalTrack) -> Result<TrackId, ClientError> {
        track.encryption = self.default_encryption;
        let cid = track.cid.clone();
        let kind = track.kind;

        let media_kind = match kind {
            TrackKind::Audio => MediaKind::Audio,
            TrackKind::Video => MediaKind::Video,
        };

        // Step 2: ask the media engine for an outbound sender.
        let peer = self.publisher_peer().await?;
        let handle = peer.add_track(media_kind, &cid).await?;
        if handle.0 != cid.as_str() {
            return Err(ClientError::Publish(PublishError::CidMismatch));
        }
        track.sender = Some(handle);

        let (tx, rx) = oneshot::channel();
        let track_id = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            let track_id = inner.arena.insert(Track::Local(track.clone()));
            inner.cid_index.insert(cid.clone(), track_id);
            inner.pending_publishes.insert(cid.clone(), tx);
            track_id
        };

        // Step 3/4: build and send the AddTrackRequest.
        let request = AddTrackRequest {
            cid: cid.clone(),
            name: track.name.clone(),
            kind: track.kind,
            source: track.source,
            muted: track.muted,
            sid: Sid::empty(),
            encryption: track.encryption,
        };
        let sent = self.engine.send(SignalRequest::AddTrack(request)).await;
        if !sent {
            self.resolve_publish(&cid, Err(PublishError::Timeout));
            let _ = rx.await;
            self.drop_unacked_publish(track_id, &cid).await;
            return Err(ClientError::Publish(PublishError::Timeout));
        }

        // Step 5: await the server's SID assignment.
        match rx.await {
            Ok(Ok(sid)) => {
                self.bind_sid(track_id, sid.clone());
                self.notify({
                    let cid = cid.clone();
                    let sid = sid.clone();
                    move |l| l.on_sid_changed(cid.clone(), sid.clone())
                });
                Ok(track_id)
            }
            Ok(Err(err)) => {
                self.drop_unacked_publish(track_id, &cid).await;
                self.notify({
                    let cid = cid.clone();
                    move |l| l.on_publish_error(cid.clone(), err)
                });
                Err(ClientError::Publish(err))
            }
            Err(_) => {
                // Sender dropped without a resolution: transport
                // closed before ack (§4.3 "If the server never
                // acknowledges").
                self.drop_unacked_publish(track_id, &cid).await;
                Err(ClientError::Publish(PublishError::Timeout))
            }
        }
    }

    /// Drops the sender binding and removes the track from the arena
    /// without losing the CID identity contract (§4.3: "the sender
    /// binding is dropped and the track returns to the unpublished
    /// state without losing its CID" — callers that want to retry
    /// re-publish with a fresh `create_local_track`/`publish` pair
    /// since this controller does not cache unpublished local tracks
    /// across attempts).
    async fn drop_unacked_publish(self: &Arc<Self>, track_id: TrackId, cid: &Cid) {
        let removed = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            inner.pending_publishes.remove(cid);
            inner.cid_index.remove(cid);
            inner.arena.remove(track_id)
        };
        if let Some(Track::Local(track)) = removed {
            if let Some(sender) = track.sender {
                if let Ok(peer) = self.publisher_peer().await {
                    let _ = peer.remove_track(&sender).await;
                }
            }
        }
    }

    fn resolve_publish(&self, cid: &Cid, result: Result<Sid, PublishError>) {
        let sender = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            inner.pending_publishes.remove(cid)
        };
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }

    fn bind_sid(&self, track_id: TrackId, sid: Sid) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        if let Some(Track::Local(track)) = inner.arena.get_mut(track_id) {
            track.sid = Some(sid.clone());
        }
        inner.sid_index.insert(sid, track_id);
    }

    /// Local mute toggle (§4.3 "Local mute"). A no-op when the track
    /// is already at the requested state (§8 "Mute idempotence").
    ///
    /// Muting releases the outbound sender rather than merely leaving
    /// it in place, and unmuting re-adds one: the arena's `sender`
    /// field always reflects whether the media engine currently holds
    /// a live binding for this track, so a later `leave()` or second
    /// mute never operates on a handle the engine has already dropped.
    pub async fn set_local_mute(
        self: &Arc<Self>,
        track_id: TrackId,
        muted: bool,
    ) -> Result<(), ClientError> {
        let (already, sid, cid, kind, sender) = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            match inner.arena.get_mut(track_id).and_then(Track::as_local_mut) {
                Some(track) => {
                    let already = track.muted == muted;
                    if !already {
                        track.muted = muted;
                    }
                    (already, track.sid.clone(), track.cid.clone(), track.kind, track.sender.clone())
                }
                None => {
                    return Err(ClientError::Protocol(ProtocolError::MissingRequiredField(
                        "track_id",
                    )))
                }
            }
        };
        if already {
            return Ok(());
        }

        // Disabling/resuming outbound media is best-effort at this seam
        // (the same treatment `leave()` gives sender release): a
        // collaborator that can't be reached still gets the wire
        // request sent below, but the arena's `sender` field is only
        // ever updated to reflect a binding the media engine actually
        // confirmed.
        if let Ok(peer) = self.publisher_peer().await {
            if muted {
                if let Some(sender) = sender {
                    let _ = peer.remove_track(&sender).await;
                }
                self.set_track_sender(track_id, None);
            } else if sender.is_none() {
                let media_kind = match kind {
                    TrackKind::Audio => MediaKind::Audio,
                    TrackKind::Video => MediaKind::Video,
                };
                if let Ok(new_sender) = peer.add_track(media_kind, &cid).await {
                    self.set_track_sender(track_id, Some(new_sender));
                }
            }
        }

        if let Some(sid) = sid {
            {
                let mut inner = self.inner.lock().expect("controller lock poisoned");
                inner.pending_mutes.insert(sid.clone(), muted);
            }
            self.engine.send(SignalRequest::Mute(MuteTrackRequest { sid, muted })).await;
        }
        Ok(())
    }

    fn set_track_sender(&self, track_id: TrackId, sender: Option<MediaHandleId>) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        if let Some(Track::Local(track)) = inner.arena.get_mut(track_id) {
            track.sender = sender;
        }
    }

    /// Graceful leave (§4.3, §8 scenario 6): releases every local
    /// sender and sends `Leave`.
    pub async fn leave(self: &Arc<Self>, reason: LeaveReason, can_reconnect: bool) {
        let senders: Vec<MediaHandleId> = {
            let inner = self.inner.lock().expect("controller lock poisoned");
            inner
                .arena
                .iter()
                .filter_map(|(_, t)| t.as_local())
                .filter_map(|t| t.sender.clone())
                .collect()
        };
        if let Ok(peer) = self.publisher_peer().await {
            for sender in senders {
                let _ = peer.remove_track(&sender).await;
            }
        }
        self.engine.send_leave(LeaveRequest { reason, can_reconnect }).await;
        self.engine.disconnect().await;
    }

    /// Reconnect policy (§4.3 "Retries and recovery"): on a non-fatal
    /// transport drop, retries `connect()` with exponential backoff
    /// (grounded on `medea-jason`'s `backoff` dependency) until
    /// `Connected` or a fatal error. Quick-reconnect mode is selected
    /// automatically, since [`Self::on_join`] pushes the server's
    /// participant SID into the engine's `ConnectionParams` as soon as
    /// it arrives.
    pub async fn reconnect_with_backoff(&self) -> bool {
        let mut backoff = ExponentialBackoff::default();
        loop {
            if self.engine.connect().await {
                return true;
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    warn!(?delay, "reconnect attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
                None => return false,
            }
        }
    }

    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<Track> {
        self.inner.lock().expect("controller lock poisoned").arena.get(id).cloned()
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.inner.lock().expect("controller lock poisoned").arena.len()
    }

    /// §4.3 "Fatal errors ... clear all local bindings (tracks are
    /// preserved but their senders are released)".
    fn clear_bindings(&self) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        for (_, track) in inner.arena.iter_mut() {
            if let Track::Local(local) = track {
                local.sender = None;
            }
        }
    }

    #[must_use]
    fn remote_track_for(&self, sid: &Sid) -> Option<RemoteTrack> {
        let inner = self.inner.lock().expect("controller lock poisoned");
        let track_id = inner.sid_index.get(sid)?;
        inner.arena.get(*track_id)?.as_remote().cloned()
    }

    /// §4.3 subscribe path, receiver-arrived half: binds a pending
    /// `TrackInfo` to its inbound receiver, rebinds an already-known
    /// remote track's receiver, or — if neither is true yet — records
    /// the receiver so [`register_remote_track_info`] can bind it once
    /// the `TrackInfo` shows up.
    pub fn on_receiver_added(&self, remote_id: String, receiver: MediaHandleId) {
        let sid = Sid::from(remote_id);
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        if let Some(info) = inner.pending_track_info.remove(&sid) {
            bind_remote_track(&mut inner, info, Some(receiver));
            drop(inner);
            if let Some(track) = self.remote_track_for(&sid) {
                self.notify(move |l| l.on_remote_track_added(track.clone()));
            }
        } else if let Some(track_id) = inner.sid_index.get(&sid).copied() {
            if let Some(Track::Remote(remote)) = inner.arena.get_mut(track_id) {
                remote.receiver = Some(receiver);
            }
        } else {
            inner.pending_receivers.insert(sid, receiver);
        }
    }
}

impl TransportListener for MediaSessionController {
    fn on_state_changed(&self, state: TransportState) {
        if state == TransportState::Disconnected {
            // Fatal errors clear bindings entirely (§4.3); non-fatal
            // drops are handled by `on_transport_error` below, which
            // runs on the same event task before this one fires.
            info!("session controller observed transport disconnect");
        }
    }

    fn on_transport_error(&self, err: TransportError) {
        if err.is_fatal() {
            self.clear_bindings();
        }
    }
}

impl ServerListener for MediaSessionController {
    fn on_join(&self, response: JoinResponse) {
        let participant_sid = response.participant_sid.clone();
        let mut newly_bound = Vec::new();
        {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            inner.participant_sid = Some(participant_sid.clone());
            for participant in &response.other_participants {
                for info in &participant.tracks {
                    if let Some(sid) = register_remote_track_info(&mut inner, info.clone()) {
                        newly_bound.push(sid);
                    }
                }
            }
        }
        for sid in newly_bound {
            if let Some(track) = self.remote_track_for(&sid) {
                self.notify(move |l| l.on_remote_track_added(track.clone()));
            }
        }

        // Propagate the server-assigned SID into the engine's connection
        // params so a later reconnect picks quick-reconnect mode instead
        // of a fresh full join (§4.2's reconnect-mode table).
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let params = engine.params().await.with_participant_sid(participant_sid);
            engine.set_params(params).await;
        });
    }

    /// §4.3 "drives the media-engine collaborator (offer/answer SDP...)":
    /// a server-initiated offer is answered by setting it as the remote
    /// description, generating an answer, and sending it back.
    fn on_offer(&self, sdp: SessionDescription) {
        let Some(controller) = self.self_weak.upgrade() else { return };
        tokio::spawn(async move {
            let peer = match controller.publisher_peer().await {
                Ok(peer) => peer,
                Err(err) => {
                    warn!(?err, "failed to obtain peer connection for inbound offer");
                    return;
                }
            };
            if let Err(err) = peer.set_remote_description(sdp).await {
                warn!(?err, "failed to set remote description from offer");
                return;
            }
            let answer = match peer.create_answer().await {
                Ok(answer) => answer,
                Err(err) => {
                    warn!(?err, "failed to create answer");
                    return;
                }
            };
            if let Err(err) = peer.set_local_description(answer.clone()).await {
                warn!(?err, "failed to set local description for answer");
                return;
            }
            controller.engine.send(SignalRequest::Answer(answer)).await;
        });
    }

    /// Hands a trickled ICE candidate to the media engine collaborator.
    fn on_trickle(&self, trickle: TrickleRequest) {
        let Some(controller) = self.self_weak.upgrade() else { return };
        tokio::spawn(async move {
            match controller.publisher_peer().await {
                Ok(peer) => {
                    if let Err(err) = peer.add_ice_candidate(trickle.candidate).await {
                        warn!(?err, "failed to apply trickled ICE candidate");
                    }
                }
                Err(err) => warn!(?err, "failed to obtain peer connection for trickle"),
            }
        });
    }

    fn on_track_published(&self, response: TrackPublishedResponse) {
        let resolved = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            inner.pending_publishes.remove(&response.cid).map(|tx| (tx, response.track.sid.clone()))
        };
        match resolved {
            Some((tx, sid)) => {
                let _ = tx.send(Ok(sid));
            }
            None => {
                // Not one of ours: a remote participant's publish.
                let added = {
                    let mut inner = self.inner.lock().expect("controller lock poisoned");
                    register_remote_track_info(&mut inner, response.track.clone());
                    self.remote_track_for(&response.track.sid)
                };
                if let Some(track) = added {
                    self.notify(move |l| l.on_remote_track_added(track.clone()));
                }
            }
        }
    }

    fn on_track_unpublished(&self, response: TrackUnpublishedResponse) {
        {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            if let Some(track_id) = inner.sid_index.remove(&response.track_sid) {
                inner.arena.remove(track_id);
            }
            inner.pending_track_info.remove(&response.track_sid);
            inner.pending_receivers.remove(&response.track_sid);
        }
        self.notify({
            let sid = response.track_sid.clone();
            move |l| l.on_remote_track_removed(sid.clone())
        });
    }

    fn on_mute(&self, mute: MuteTrackRequest) {
        let pending = {
            let mut inner = self.inner.lock().expect("controller lock poisoned");
            let pending = inner.pending_mutes.remove(&mute.sid);
            if let Some(track_id) = inner.sid_index.get(&mute.sid).copied() {
                if let Some(track) = inner.arena.get_mut(track_id) {
                    match track {
                        Track::Local(local) => local.remote_side_mute = mute.muted,
                        Track::Remote(remote) => remote.muted = mute.muted,
                    }
                }
            }
            pending
        };
        if pending.is_some() {
            self.notify({
                let sid = mute.sid.clone();
                let muted = mute.muted;
                move |l| l.on_mute_changed(sid.clone(), muted)
            });
        } else {
            self.notify({
                let sid = mute.sid.clone();
                let muted = mute.muted;
                move |l| l.on_remote_side_mute_changed(sid.clone(), muted)
            });
        }
    }
}

/// Inserts a `RemoteTrack` into the arena and its SID index, wiring in
/// a receiver handle if one is already available.
fn bind_remote_track(inner: &mut Inner, info: TrackInfo, receiver: Option<MediaHandleId>) -> TrackId {
    let sid = info.sid.clone();
    let track_id = inner.arena.insert(Track::Remote(RemoteTrack {
        sid: sid.clone(),
        name: info.name,
        kind: info.kind,
        source: info.source,
        encryption: info.encryption,
        muted: info.muted,
        receiver,
        subscribed_layer: None,
    }));
    inner.sid_index.insert(sid, track_id);
    track_id
}

/// Registers a server-announced `TrackInfo`. If a receiver already
/// arrived for this SID (the other half of the §4.3 subscribe-path
/// race), binds the `RemoteTrack` immediately and returns its SID so
/// the caller can notify listeners; otherwise the `TrackInfo` is
/// stashed until [`MediaSessionController::on_receiver_added`] sees it.
fn register_remote_track_info(inner: &mut Inner, info: TrackInfo) -> Option<Sid> {
    if inner.sid_index.contains_key(&info.sid) {
        return None;
    }
    if let Some(receiver) = inner.pending_receivers.remove(&info.sid) {
        let sid = info.sid.clone();
        bind_remote_track(inner, info, Some(receiver));
        return Some(sid);
    }
    inner.pending_track_info.insert(info.sid.clone(), info);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_remote_track_info_does_not_overwrite_bound_track() {
        let mut inner = Inner::new();
        let sid = Sid::from("TA1".to_string());
        let track_id = inner.arena.insert(Track::Remote(RemoteTrack {
            sid: sid.clone(),
            name: "cam".into(),
            kind: TrackKind::Video,
            source: TrackSource::Camera,
            encryption: EncryptionMode::None,
            muted: false,
            receiver: None,
            subscribed_layer: None,
        }));
        inner.sid_index.insert(sid.clone(), track_id);
        register_remote_track_info(
            &mut inner,
            TrackInfo {
                sid: sid.clone(),
                name: "cam".into(),
                kind: TrackKind::Video,
                source: TrackSource::Camera,
                encryption: EncryptionMode::None,
                muted: false,
            },
        );
        assert!(!inner.pending_track_info.contains_key(&sid));
    }

    #[test]
    fn register_remote_track_info_records_unbound_track() {
        let mut inner = Inner::new();
        let sid = Sid::from("TA2".to_string());
        register_remote_track_info(
            &mut inner,
            TrackInfo {
                sid: sid.clone(),
                name: "mic".into(),
                kind: TrackKind::Audio,
                source: TrackSource::Microphone,
                encryption: EncryptionMode::None,
                muted: true,
            },
        );
        assert!(inner.pending_track_info.contains_key(&sid));
    }

    #[test]
    fn register_remote_track_info_binds_a_receiver_that_arrived_first() {
        let mut inner = Inner::new();
        let sid = Sid::from("TA3".to_string());
        inner.pending_receivers.insert(sid.clone(), MediaHandleId("remote-1".into()));

        let bound = register_remote_track_info(
            &mut inner,
            TrackInfo {
                sid: sid.clone(),
                name: "cam".into(),
                kind: TrackKind::Video,
                source: TrackSource::Camera,
                encryption: EncryptionMode::None,
                muted: false,
            },
        );

        assert_eq!(bound, Some(sid.clone()));
        assert!(!inner.pending_receivers.contains_key(&sid));
        assert!(!inner.pending_track_info.contains_key(&sid));
        let track_id = *inner.sid_index.get(&sid).unwrap();
        let remote = inner.arena.get(track_id).unwrap().as_remote().unwrap();
        assert_eq!(remote.receiver, Some(MediaHandleId("remote-1".into())));
    }
}

/// End-to-end scenarios (§8 scenarios 2/3) driven against mocked
/// `Transport`/`MediaEngine`/`PeerHandle` collaborators. Requires the
/// `mockable` feature, which gates the `automock`-generated types
/// behind a feature flag rather than a bare `#[cfg(test)]`.
#[cfg(all(test, feature = "mockable"))]
mod integration_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use nova_protocol::EncryptionMode;

    use super::*;
    use crate::engine::state::TransportState;
    use crate::platform::{MockMediaEngine, MockPeerHandle, MockTransport, TransportEvent};

    /// Connects a [`SignalingEngine`] against a [`MockTransport`] that
    /// immediately reports `Connected` and counts outbound frames.
    async fn connected_engine_with_send_counter() -> (Arc<SignalingEngine>, Arc<AtomicUsize>) {
        let send_count = Arc::new(AtomicUsize::new(0));
        let counter = send_count.clone();
        let mut mock = MockTransport::new();
        mock.expect_open().times(1).returning(|_url, events| {
            let _ = events.send(TransportEvent::StateChanged(TransportState::Connected));
            Ok(())
        });
        mock.expect_send_binary().returning(move |_frame| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        mock.expect_close().returning(|| ());

        let transport: Arc<dyn Transport> = Arc::new(mock);
        let (queue, _handle) = EventQueue::spawn();
        let engine = Arc::new(SignalingEngine::new(
            transport,
            nova_protocol::ConnectionParams::new("wss://sfu.example/", "T"),
            nova_protocol::ClientInfo::new("1.0.0", "linux", "1", "pc", "wired"),
            queue,
        ));
        assert!(engine.connect().await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.state().await, TransportState::Connected);
        (engine, send_count)
    }

    fn media_with_passthrough_add_track() -> Arc<dyn MediaEngine> {
        let mut media = MockMediaEngine::new();
        media.expect_create_peer_connection().returning(|_config, _events| {
            let mut peer = MockPeerHandle::new();
            peer.expect_add_track()
                .returning(|_kind, cid| Ok(MediaHandleId(cid.as_str().to_string())));
            peer.expect_remove_track().returning(|_sender| Ok(()));
            Ok(Arc::new(peer) as Arc<dyn PeerHandle>)
        });
        Arc::new(media)
    }

    /// §8 scenario 2: publishing a local track resolves once the
    /// server echoes a SID for its CID, and the sender's local media
    /// id equals the CID.
    #[tokio::test]
    async fn publish_resolves_to_server_sid() {
        let (engine, _send_count) = connected_engine_with_send_counter().await;
        let (queue, _handle) = EventQueue::spawn();
        let controller = MediaSessionController::new(
            engine,
            media_with_passthrough_add_track(),
            Arc::new(crate::platform::DefaultUuidGenerator),
            queue,
            EncryptionMode::None,
        );

        let track = controller.create_local_track("mic", TrackKind::Audio, TrackSource::Microphone);
        let cid = track.cid.clone();

        let awaiting = controller.clone();
        let publish = tokio::spawn(async move { awaiting.publish(track).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        controller.on_track_published(TrackPublishedResponse {
            cid: cid.clone(),
            track: TrackInfo {
                sid: Sid::from("TA1".to_string()),
                name: "mic".into(),
                kind: TrackKind::Audio,
                source: TrackSource::Microphone,
                encryption: EncryptionMode::None,
                muted: false,
            },
        });

        let track_id = publish.await.expect("publish task panicked").expect("publish failed");
        let bound = controller.track(track_id).unwrap();
        let local = bound.as_local().unwrap();
        assert_eq!(local.sid, Some(Sid::from("TA1".to_string())));
        assert_eq!(local.sender.as_ref().unwrap().0, cid.as_str());
    }

    /// §8 scenario 3: muting sends exactly one `MuteTrackRequest` and
    /// a repeated `mute(true)` is a no-op (the idempotence property).
    #[tokio::test]
    async fn mute_is_sent_once_and_idempotent() {
        let (engine, send_count) = connected_engine_with_send_counter().await;
        let (queue, _handle) = EventQueue::spawn();
        let controller = MediaSessionController::new(
            engine,
            media_with_passthrough_add_track(),
            Arc::new(crate::platform::DefaultUuidGenerator),
            queue,
            EncryptionMode::None,
        );

        let track = controller.create_local_track("mic", TrackKind::Audio, TrackSource::Microphone);
        let cid = track.cid.clone();
        let awaiting = controller.clone();
        let publish = tokio::spawn(async move { awaiting.publish(track).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.on_track_published(TrackPublishedResponse {
            cid,
            track: TrackInfo {
                sid: Sid::from("TA1".to_string()),
                name: "mic".into(),
                kind: TrackKind::Audio,
                source: TrackSource::Microphone,
                encryption: EncryptionMode::None,
                muted: false,
            },
        });
        let track_id = publish.await.unwrap().unwrap();

        let after_publish = send_count.load(Ordering::SeqCst);
        controller.set_local_mute(track_id, true).await.unwrap();
        assert_eq!(send_count.load(Ordering::SeqCst), after_publish + 1);

        controller.set_local_mute(track_id, true).await.unwrap();
        assert_eq!(send_count.load(Ordering::SeqCst), after_publish + 1);
    }
}
