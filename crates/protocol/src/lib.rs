//! Wire protocol for talking to a Nova media server: the semantic value
//! model (§3), the length-delimited binary codec (§4.1), and signaling
//! URL assembly (§6).
//!
//! This crate has no I/O and no async — it is the pure mapping between
//! Rust values and bytes on the wire, consumed by `nova-client`'s
//! signaling engine.

pub mod codec;
pub mod ids;
pub mod model;
pub mod request;
pub mod response;
pub mod url;

pub use codec::DecodeError;
pub use ids::{Cid, ParticipantSid, RoomSid, Sid};
pub use model::*;
pub use request::SignalRequest;
pub use response::SignalResponse;
pub use url::{ConnectionParams, ReconnectMode};
