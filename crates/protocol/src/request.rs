//! Client → server messages (§6 "Request variants").

use serde::{Deserialize, Serialize};

use crate::ids::Sid;
use crate::model::{
    AddTrackRequest, LeaveRequest, MuteTrackRequest, Ping, SessionDescription, TrickleRequest,
    UpdateLayersRequest,
};

/// One `SignalRequest` variant per row of §6's request list. Every
/// variant here is one this revision (`ClientInfo::PROTOCOL_VERSION`)
/// is allowed to emit; §9's open question about `UpdateAudioTrack`/
/// `UpdateVideoTrack` being revision-gated is handled by
/// [`SignalRequest::requires_protocol`], checked before
/// `nova_client::engine::SignalingEngine::send` hands a frame to the
/// transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignalRequest {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Trickle(TrickleRequest),
    AddTrack(AddTrackRequest),
    Mute(MuteTrackRequest),
    Subscription { track_sids: Vec<Sid>, subscribe: bool },
    TrackSetting { track_sid: Sid, disabled: bool },
    Leave(LeaveRequest),
    UpdateLayers(UpdateLayersRequest),
    SubscriptionPermission { all_participants: bool, track_permissions: Vec<Sid> },
    SyncState { subscribed_track_sids: Vec<Sid> },
    Simulate { scenario: String },
    UpdateMetadata { metadata: String },
    PingReq(Ping),
    /// Gated on protocol revision ≥ [`SignalRequest::AUDIO_VIDEO_UPDATE_MIN_PROTOCOL`]
    /// (§9 open question).
    UpdateAudioTrack { track_sid: Sid, muted: bool },
    /// Gated the same way as [`SignalRequest::UpdateAudioTrack`].
    UpdateVideoTrack { track_sid: Sid, layer: u8 },
}

impl SignalRequest {
    /// Minimum protocol revision that may emit `UpdateAudioTrack`/
    /// `UpdateVideoTrack` (§9).
    pub const AUDIO_VIDEO_UPDATE_MIN_PROTOCOL: u32 = 10;

    /// Whether this request may be emitted under the given protocol
    /// revision. Every variant but the two gated ones is unconditionally
    /// allowed.
    #[must_use]
    pub fn requires_protocol(&self, revision: u32) -> bool {
        match self {
            Self::UpdateAudioTrack { .. } | Self::UpdateVideoTrack { .. } => {
                revision >= Self::AUDIO_VIDEO_UPDATE_MIN_PROTOCOL
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LeaveReason;

    #[test]
    fn update_audio_track_gated_by_revision() {
        let req = SignalRequest::UpdateAudioTrack {
            track_sid: Sid::from("TA1".to_string()),
            muted: true,
        };
        assert!(!req.requires_protocol(9));
        assert!(req.requires_protocol(10));
    }

    #[test]
    fn leave_is_never_gated() {
        let req = SignalRequest::Leave(LeaveRequest {
            reason: LeaveReason::ClientInitiated,
            can_reconnect: false,
        });
        assert!(req.requires_protocol(0));
    }
}
