//! Length-delimited binary framing (§4.1, §6 "Wire framing").
//!
//! A frame is `[u32 LE payload length][payload]`, where `payload` is
//! the `bincode`-encoded `SignalRequest`/`SignalResponse` value.
//! `bincode`'s default configuration writes an enum's variant index as
//! a leading `u32` (little-endian) ahead of that variant's fields —
//! this codec peeks that index before running the full decode so it
//! can hand back [`DecodeError::UnknownVariant`] for a tag this
//! revision doesn't name, without ever attempting to parse fields it
//! doesn't understand (§4.1: "unknown variants are ignored on
//! receive, never emitted on send").

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::request::SignalRequest;
use crate::response::SignalResponse;

const LENGTH_PREFIX_SIZE: usize = 4;
const VARIANT_TAG_SIZE: usize = 4;

/// Number of `SignalRequest` variants this revision names (§6). Kept
/// in lockstep with [`SignalRequest`] by the `request_variant_count`
/// test below.
const REQUEST_VARIANT_COUNT: u32 = 16;
/// Number of `SignalResponse` variants this revision names (§6).
const RESPONSE_VARIANT_COUNT: u32 = 21;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The length prefix is missing, or declares a payload longer or
    /// shorter than the bytes actually present.
    #[error("invalid framing: buffer has {actual} bytes, frame declares {declared}")]
    InvalidFraming { declared: usize, actual: usize },
    /// The leading variant tag does not name a variant this revision
    /// knows. Per §4.1 the caller should drop the message silently
    /// (a counter metric is recommended, not mandated).
    #[error("unknown variant tag {0}")]
    UnknownVariant(u32),
    /// The tag was recognized but a field inside the variant (most
    /// often a nested enum like [`crate::TrackKind`]) decoded to a
    /// numeric value with no corresponding case.
    #[error("field out of range decoding variant {tag}: {source}")]
    FieldOutOfRange {
        tag: u32,
        #[source]
        source: Box<bincode::ErrorKind>,
    },
}

/// Result of decoding one frame: either a value, or an explicit marker
/// that the frame named a variant newer than this revision knows
/// about (§4.1 "decode a frame ... MAY [fail] for newer variants: the
/// decoder returns an ignore-marker").
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded<T> {
    Value(T),
    UnknownVariant(u32),
}

/// Encodes a value into a length-delimited frame. Infallible for any
/// value built through this crate's constructors (§4.1): the only way
/// `bincode` fails here is an unsupported type, which none of our
/// wire types are.
#[must_use]
pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    let payload = bincode::serialize(value).expect("wire value must be bincode-encodable");
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame
}

#[must_use]
pub fn encode_request(value: &SignalRequest) -> Vec<u8> {
    encode(value)
}

#[must_use]
pub fn encode_response(value: &SignalResponse) -> Vec<u8> {
    encode(value)
}

fn decode_generic<T: DeserializeOwned>(
    frame: &[u8],
    known_variants: u32,
) -> Result<Decoded<T>, DecodeError> {
    if frame.len() < LENGTH_PREFIX_SIZE {
        return Err(DecodeError::InvalidFraming { declared: 0, actual: frame.len() });
    }
    let declared =
        u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let payload = &frame[LENGTH_PREFIX_SIZE..];
    if payload.len() != declared {
        return Err(DecodeError::InvalidFraming { declared, actual: payload.len() });
    }
    if payload.len() < VARIANT_TAG_SIZE {
        return Err(DecodeError::InvalidFraming { declared, actual: payload.len() });
    }

    let tag = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if tag >= known_variants {
        return Ok(Decoded::UnknownVariant(tag));
    }

    bincode::deserialize(payload)
        .map(Decoded::Value)
        .map_err(|source| DecodeError::FieldOutOfRange { tag, source })
}

/// Decodes one frame into a [`SignalRequest`].
pub fn decode_request(frame: &[u8]) -> Result<Decoded<SignalRequest>, DecodeError> {
    decode_generic(frame, REQUEST_VARIANT_COUNT)
}

/// Decodes one frame into a [`SignalResponse`].
pub fn decode_response(frame: &[u8]) -> Result<Decoded<SignalResponse>, DecodeError> {
    decode_generic(frame, RESPONSE_VARIANT_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Cid, Sid};
    use crate::model::{
        AddTrackRequest, EncryptionMode, LeaveReason, LeaveRequest, Ping, Pong, SdpKind,
        SessionDescription, TrackKind, TrackSource,
    };

    fn sample_requests() -> Vec<SignalRequest> {
        vec![
            SignalRequest::Offer(SessionDescription { kind: SdpKind::Offer, sdp: "v=0".into() }),
            SignalRequest::Answer(SessionDescription {
                kind: SdpKind::Answer,
                sdp: "v=0".into(),
            }),
            SignalRequest::AddTrack(AddTrackRequest {
                cid: Cid::generate(),
                name: "mic".into(),
                kind: TrackKind::Audio,
                source: TrackSource::Microphone,
                muted: false,
                sid: Sid::empty(),
                encryption: EncryptionMode::None,
            }),
            SignalRequest::Leave(LeaveRequest {
                reason: LeaveReason::ClientInitiated,
                can_reconnect: false,
            }),
            SignalRequest::PingReq(Ping { timestamp_ms: 42 }),
        ]
    }

    #[test]
    fn request_round_trip() {
        for req in sample_requests() {
            let frame = encode_request(&req);
            let decoded = decode_request(&frame).unwrap();
            assert_eq!(decoded, Decoded::Value(req));
        }
    }

    #[test]
    fn response_round_trip() {
        let pong = SignalResponse::Pong(Pong { last_ping_timestamp_ms: 1, timestamp_ms: 2 });
        let frame = encode_response(&pong);
        assert_eq!(decode_response(&frame).unwrap(), Decoded::Value(pong));
    }

    #[test]
    fn truncated_length_prefix_is_invalid_framing() {
        let err = decode_request(&[0u8, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFraming { .. }));
    }

    #[test]
    fn declared_length_mismatch_is_invalid_framing() {
        let req = SignalRequest::PingReq(Ping { timestamp_ms: 1 });
        let mut frame = encode_request(&req);
        // Lie about the payload length.
        frame[0..4].copy_from_slice(&999u32.to_le_bytes());
        let err = decode_request(&frame).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFraming { declared: 999, .. }));
    }

    #[test]
    fn unknown_variant_tag_is_ignored_not_errored() {
        let mut frame = Vec::new();
        let payload_tag = REQUEST_VARIANT_COUNT + 5;
        let payload = payload_tag.to_le_bytes();
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        let decoded = decode_request(&frame).unwrap();
        assert_eq!(decoded, Decoded::<SignalRequest>::UnknownVariant(payload_tag));
    }

    #[test]
    fn request_variant_count_matches_enum() {
        // Every arm below must compile; a variant added to
        // `SignalRequest` without updating `REQUEST_VARIANT_COUNT`
        // will desync the unknown-variant boundary, so this match is
        // exhaustive on purpose.
        fn assert_exhaustive(req: &SignalRequest) {
            match req {
                SignalRequest::Offer(_)
                | SignalRequest::Answer(_)
                | SignalRequest::Trickle(_)
                | SignalRequest::AddTrack(_)
                | SignalRequest::Mute(_)
                | SignalRequest::Subscription { .. }
                | SignalRequest::TrackSetting { .. }
                | SignalRequest::Leave(_)
                | SignalRequest::UpdateLayers(_)
                | SignalRequest::SubscriptionPermission { .. }
                | SignalRequest::SyncState { .. }
                | SignalRequest::Simulate { .. }
                | SignalRequest::UpdateMetadata { .. }
                | SignalRequest::PingReq(_)
                | SignalRequest::UpdateAudioTrack { .. }
                | SignalRequest::UpdateVideoTrack { .. } => {}
            }
        }
        assert_exhaustive(&SignalRequest::PingReq(Ping { timestamp_ms: 0 }));
    }

    #[test]
    fn response_variant_count_matches_enum() {
        fn assert_exhaustive(resp: &SignalResponse) {
            match resp {
                SignalResponse::Join(_)
                | SignalResponse::Offer(_)
                | SignalResponse::Answer(_)
                | SignalResponse::Trickle(_)
                | SignalResponse::Update(_)
                | SignalResponse::TrackPublished(_)
                | SignalResponse::Leave(_)
                | SignalResponse::Mute(_)
                | SignalResponse::SpeakersChanged { .. }
                | SignalResponse::RoomUpdate { .. }
                | SignalResponse::ConnectionQuality { .. }
                | SignalResponse::StreamStateUpdate(_)
                | SignalResponse::SubscribedQualityUpdate { .. }
                | SignalResponse::SubscriptionPermissionUpdate { .. }
                | SignalResponse::RefreshToken { .. }
                | SignalResponse::TrackUnpublished(_)
                | SignalResponse::Pong(_)
                | SignalResponse::ReconnectResponse { .. }
                | SignalResponse::SubscriptionResponse { .. }
                | SignalResponse::RequestResponse { .. }
                | SignalResponse::TrackSubscribed { .. } => {}
            }
        }
        assert_exhaustive(&SignalResponse::Pong(Pong {
            last_ping_timestamp_ms: 0,
            timestamp_ms: 0,
        }));
    }
}
