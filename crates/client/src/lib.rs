//! `nova-client`: a signaling and media session client SDK for a Nova
//! SFU room.
//!
//! [`room::Room`] is the entry point most applications want: it wires
//! one [`engine::SignalingEngine`] to one [`controller::MediaSessionController`]
//! and exposes `connect`/`disconnect`/`publish`/`leave`. Applications
//! that need finer control over signaling or session state can drive
//! [`engine::SignalingEngine`] and [`controller::MediaSessionController`]
//! directly instead.

pub mod controller;
pub mod engine;
pub mod error;
pub mod platform;
pub mod room;
pub mod track;
pub mod transport;

pub use controller::{ControllerListener, MediaSessionController};
pub use engine::listeners::{ServerListener, TransportListener};
pub use engine::state::TransportState;
pub use engine::SignalingEngine;
pub use error::ClientError;
pub use room::{ConnectOptions, Room};
pub use track::{LocalTrack, RemoteTrack, Track, TrackId};
