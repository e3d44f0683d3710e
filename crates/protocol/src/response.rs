//! Server → client messages (§6 "Response variants").

use serde::{Deserialize, Serialize};

use crate::ids::{ParticipantSid, Sid};
use crate::model::{
    ConnectionQualityUpdate, JoinResponse, LeaveRequest, MuteTrackRequest, ParticipantUpdate, Pong,
    SessionDescription, StreamStateUpdate, TrackInfo, TrackPublishedResponse,
    TrackUnpublishedResponse, TrickleRequest,
};

/// One `SignalResponse` variant per row of §6's response list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignalResponse {
    Join(JoinResponse),
    Offer(SessionDescription),
    Answer(SessionDescription),
    Trickle(TrickleRequest),
    Update(ParticipantUpdate),
    TrackPublished(TrackPublishedResponse),
    Leave(LeaveRequest),
    Mute(MuteTrackRequest),
    SpeakersChanged { speakers: Vec<ParticipantSid> },
    RoomUpdate { metadata: String },
    ConnectionQuality { updates: Vec<ConnectionQualityUpdate> },
    StreamStateUpdate(StreamStateUpdate),
    SubscribedQualityUpdate { track_sid: Sid, layer: u8 },
    SubscriptionPermissionUpdate { track_sid: Sid, allowed: bool },
    RefreshToken { token: String },
    TrackUnpublished(TrackUnpublishedResponse),
    Pong(Pong),
    ReconnectResponse { ice_servers: Vec<crate::model::IceServerInfo> },
    SubscriptionResponse { track_sid: Sid, allowed: bool },
    RequestResponse { request_id: u32, accepted: bool, message: String },
    TrackSubscribed { track_sid: Sid },
}

impl SignalResponse {
    /// Human-readable discriminant name, used for drop-reason logging
    /// when a message can't be dispatched (e.g. handler not registered).
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Join(_) => "Join",
            Self::Offer(_) => "Offer",
            Self::Answer(_) => "Answer",
            Self::Trickle(_) => "Trickle",
            Self::Update(_) => "Update",
            Self::TrackPublished(_) => "TrackPublished",
            Self::Leave(_) => "Leave",
            Self::Mute(_) => "Mute",
            Self::SpeakersChanged { .. } => "SpeakersChanged",
            Self::RoomUpdate { .. } => "RoomUpdate",
            Self::ConnectionQuality { .. } => "ConnectionQuality",
            Self::StreamStateUpdate(_) => "StreamStateUpdate",
            Self::SubscribedQualityUpdate { .. } => "SubscribedQualityUpdate",
            Self::SubscriptionPermissionUpdate { .. } => "SubscriptionPermissionUpdate",
            Self::RefreshToken { .. } => "RefreshToken",
            Self::TrackUnpublished(_) => "TrackUnpublished",
            Self::Pong(_) => "Pong",
            Self::ReconnectResponse { .. } => "ReconnectResponse",
            Self::SubscriptionResponse { .. } => "SubscriptionResponse",
            Self::RequestResponse { .. } => "RequestResponse",
            Self::TrackSubscribed { .. } => "TrackSubscribed",
        }
    }
}
