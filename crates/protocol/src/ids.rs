//! Identifier newtypes for wire-visible entities.
//!
//! [`Cid`] and [`Sid`] are wire identifiers (§3 glossary: CID is
//! client-minted, SID is server-authoritative). The internal
//! `TrackId` arena key (see SPEC_FULL.md §9) never appears on the
//! wire, so it lives in `nova_client::track` instead of here.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-assigned track identifier, minted once per [`crate::LocalTrack`]
/// and stable for its local lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cid(String);

impl Cid {
    /// Mints a fresh, URL-safe CID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned track identifier. Authoritative across the room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sid(String);

impl Sid {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The not-yet-assigned placeholder echoed in an [`crate::AddTrackRequest`].
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }
}

impl From<String> for Sid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned participant identifier, the reconnect key (§4.2).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantSid(String);

impl ParticipantSid {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ParticipantSid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned room identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomSid(String);

impl From<String> for RoomSid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RoomSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_generate_is_unique() {
        assert_ne!(Cid::generate(), Cid::generate());
    }

    #[test]
    fn sid_empty_is_empty() {
        assert!(Sid::empty().is_empty());
        assert!(!Sid::from("TA1".to_string()).is_empty());
    }
}
