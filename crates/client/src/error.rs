//! Uniform error enums (§7). One `thiserror` enum per row of the
//! table, unified under [`ClientError`] for the `Room` facade — per
//! §9's redesign note, no per-call ad hoc error type is introduced
//! beyond these.

use thiserror::Error;

use nova_protocol::DecodeError;

/// Errors surfaced by the [`crate::platform::Transport`] collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("general transport error: {0}")]
    General(String),
    #[error("not connected")]
    NoConnection,
    #[error("failed to write text frame")]
    WriteText,
    #[error("failed to write binary frame")]
    WriteBinary,
    #[error("failed to set a custom header")]
    CustomHeader,
    #[error("failed to set a socket option")]
    SocketOption,
    #[error("invalid TLS options")]
    TlsOptions,
}

impl TransportError {
    /// Whether this kind is recoverable without tearing the session
    /// down (§7: "Non-fatal kinds (`SocketOption`): log, continue.").
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SocketOption)
    }
}

/// Errors raised by the signaling engine while demultiplexing server
/// messages (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unexpected variant {variant} while in state {state:?}")]
    UnexpectedVariantInState { variant: &'static str, state: crate::engine::state::TransportState },
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

/// Errors raised while publishing a local track (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("server echoed a CID that does not match any pending publish")]
    CidMismatch,
    #[error("server did not accept the track")]
    TrackNotAccepted,
    #[error("publish was not acknowledged before the transport closed")]
    Timeout,
}

/// Unrecoverable errors that forbid auto-reconnect (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("TLS/SSL failure")]
    Ssl,
    #[error("authentication rejected")]
    Auth,
    #[error("protocol version mismatch")]
    ProtocolVersion,
}

/// Top-level error returned by the public [`crate::room::Room`] API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error("invalid connection parameters: host and auth token must be non-empty")]
    InvalidConnectionParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_option_is_the_only_non_fatal_transport_kind() {
        assert!(!TransportError::SocketOption.is_fatal());
        assert!(TransportError::NoConnection.is_fatal());
        assert!(TransportError::General("x".into()).is_fatal());
    }
}
