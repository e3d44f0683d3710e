//! Listener trait surfaces for the signaling engine (§4.2
//! "Demultiplexing", §4.4). Every method has a no-op default so a
//! given listener only overrides what it cares about, generalized to
//! the full server message set named in §6.

use nova_protocol::{
    ConnectionQualityUpdate, DecodeError, IceServerInfo, JoinResponse, LeaveRequest,
    MuteTrackRequest, ParticipantSid, ParticipantUpdate, Pong, Sid, SessionDescription,
    StreamStateUpdate, TrackPublishedResponse, TrackUnpublishedResponse, TrickleRequest,
};

use crate::engine::state::TransportState;
use crate::error::TransportError;

/// Observes transport-level state and error events (§4.2, §6).
pub trait TransportListener: Send + Sync {
    fn on_state_changed(&self, _state: TransportState) {}
    fn on_transport_error(&self, _err: TransportError) {}
    fn on_server_response_parse_error(&self, _err: &DecodeError) {}
}

/// Observes decoded server messages (§4.2's dispatch table).
#[allow(unused_variables)]
pub trait ServerListener: Send + Sync {
    fn on_join(&self, response: JoinResponse) {}
    fn on_offer(&self, sdp: SessionDescription) {}
    fn on_answer(&self, sdp: SessionDescription) {}
    fn on_trickle(&self, trickle: TrickleRequest) {}
    fn on_participant_update(&self, update: ParticipantUpdate) {}
    fn on_track_published(&self, response: TrackPublishedResponse) {}
    fn on_track_unpublished(&self, response: TrackUnpublishedResponse) {}
    fn on_leave(&self, leave: LeaveRequest) {}
    fn on_mute(&self, mute: MuteTrackRequest) {}
    fn on_speakers_changed(&self, speakers: Vec<ParticipantSid>) {}
    fn on_room_update(&self, metadata: String) {}
    fn on_connection_quality(&self, updates: Vec<ConnectionQualityUpdate>) {}
    fn on_stream_state_update(&self, update: StreamStateUpdate) {}
    fn on_subscribed_quality_update(&self, track_sid: Sid, layer: u8) {}
    fn on_subscription_permission_update(&self, track_sid: Sid, allowed: bool) {}
    fn on_refresh_token(&self, token: String) {}
    fn on_pong(&self, pong: Pong) {}
    fn on_reconnect_response(&self, ice_servers: Vec<IceServerInfo>) {}
    fn on_subscription_response(&self, track_sid: Sid, allowed: bool) {}
    fn on_request_response(&self, request_id: u32, accepted: bool, message: String) {}
    fn on_track_subscribed(&self, track_sid: Sid) {}
}
