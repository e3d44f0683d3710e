//! The semantic value model of §3: the structs and enums that travel
//! across the wire, independent of how they are framed (see
//! [`crate::codec`]) or what URL got the connection there (see
//! [`crate::url`]).

use serde::{Deserialize, Serialize};

use crate::ids::{Cid, ParticipantSid, RoomSid, Sid};

/// SDK identity sent once per connect, per §3/§6.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub sdk: String,
    pub version: String,
    pub protocol: u32,
    pub os: String,
    pub os_version: String,
    pub device_model: String,
    pub network: String,
}

impl ClientInfo {
    /// The wire protocol revision this crate implements (§3: "P").
    pub const PROTOCOL_VERSION: u32 = 15;
    /// SDK tag advertised on the wire (§8 scenario 1 uses `cpp` for the
    /// original; this SDK advertises its own tag).
    pub const SDK_TAG: &'static str = "rust";

    #[must_use]
    pub fn new(
        version: impl Into<String>,
        os: impl Into<String>,
        os_version: impl Into<String>,
        device_model: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            sdk: Self::SDK_TAG.to_string(),
            version: version.into(),
            protocol: Self::PROTOCOL_VERSION,
            os: os.into(),
            os_version: os_version.into(),
            device_model: device_model.into(),
            network: network.into(),
        }
    }
}

/// Track kind (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Track source (§3). `Unknown` covers wire values this revision
/// doesn't recognize, so a decode never has to fail outright just
/// because the server named a newer source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackSource {
    Microphone,
    Camera,
    ScreenShare,
    ScreenShareAudio,
    Unknown,
}

/// End-to-end media encryption selector (§3, §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMode {
    None,
    Gcm,
    Custom,
}

/// Target of a [`TrickleRequest`] (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrickleTarget {
    Publisher,
    Subscriber,
}

/// Offer/answer discriminator for [`SessionDescription`] (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Reason code carried in a [`LeaveRequest`]/`LeaveResponse` (§3, §8
/// scenario 6). Values beyond what this revision names fold to
/// `Unknown` rather than failing decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveReason {
    ClientInitiated,
    ServerShutdown,
    StateMismatch,
    Unknown,
}

/// Degradation preference hint for a video track, additive detail
/// recovered from `original_source/include/livekit/rtc/media/DegradationPreference.h`
/// (SPEC_FULL.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationPreference {
    /// Prefer to maintain framerate at the cost of resolution.
    MaintainFramerate,
    /// Prefer to maintain resolution at the cost of framerate.
    MaintainResolution,
    /// Balance the two.
    Balanced,
}

/// SDP produced by the media engine collaborator, traversing the
/// signaling channel (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

/// One ICE candidate, trickled as it is gathered (§3, glossary).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickleRequest {
    pub candidate: String,
    pub target: TrickleTarget,
    pub final_candidate: bool,
}

/// A request to publish a local track (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTrackRequest {
    pub cid: Cid,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub muted: bool,
    pub sid: Sid,
    pub encryption: EncryptionMode,
}

/// Request to change the local/server mute state of a track (§4.3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteTrackRequest {
    pub sid: Sid,
    pub muted: bool,
}

/// Request to change subscribed spatial/temporal layers of a remote
/// track (§6). Additive `layer` field grounded on
/// `original_source/include/livekit/rtc/media/VideoScalabilityMode.h`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLayersRequest {
    pub track_sid: Sid,
    pub layer: u8,
}

/// Server-authoritative description of a published track, echoed in
/// [`JoinResponse`] and `TrackPublished` (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub sid: Sid,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub encryption: EncryptionMode,
    pub muted: bool,
}

/// One room participant and their published tracks (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub identity: String,
    pub sid: ParticipantSid,
    pub tracks: Vec<TrackInfo>,
    pub metadata: String,
}

/// Server push of participant list changes (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub participants: Vec<ParticipantInfo>,
}

/// ICE server descriptor returned in [`JoinResponse`] (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerInfo {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Exactly-one-per-successful-connect server handshake response (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub room_sid: RoomSid,
    pub room_name: String,
    pub participant_sid: ParticipantSid,
    pub other_participants: Vec<ParticipantInfo>,
    pub ice_servers: Vec<IceServerInfo>,
    pub server_region: String,
}

/// A `TrackPublished` response: the CID/SID correspondence the publish
/// path (§4.3) is waiting for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublishedResponse {
    pub cid: Cid,
    pub track: TrackInfo,
}

/// A `TrackUnpublished` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackUnpublishedResponse {
    pub track_sid: Sid,
}

/// Keepalive message (§3, §4.2). `Ping` carries this client's
/// monotonic send time; `Pong` echoes it back alongside the server's
/// own timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub last_ping_timestamp_ms: u64,
    pub timestamp_ms: u64,
}

/// A graceful or forced leave (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub reason: LeaveReason,
    pub can_reconnect: bool,
}

/// Connection-quality sample for one participant (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Lost,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionQualityUpdate {
    pub participant: ParticipantSid,
    pub quality: ConnectionQuality,
}

/// Whether a remote track's media stream is actively flowing (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Active,
    Paused,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStateUpdate {
    pub track_sid: Sid,
    pub state: StreamState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_info_new_sets_protocol_and_sdk() {
        let info = ClientInfo::new("1.0.0", "linux", "6.9", "generic-pc", "wired");
        assert_eq!(info.protocol, ClientInfo::PROTOCOL_VERSION);
        assert_eq!(info.sdk, "rust");
        assert_eq!(info.os, "linux");
    }
}
