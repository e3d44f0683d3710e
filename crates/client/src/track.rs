//! Track model & state (§2, §3) plus the arena that replaces the
//! teacher's shared/weak pointer graphs (§9's redesign note).
//!
//! `TrackId` is a stable integer key into `MediaSessionController`'s
//! `Arena<Track>`; CID and SID are lookup keys *into* the arena, never
//! identities on their own — this is what "eliminates cyclic ownership
//! between senders and tracks" (§9).

use std::collections::HashMap;

use nova_protocol::{Cid, DegradationPreference, EncryptionMode, Sid, TrackKind, TrackSource};

use crate::platform::MediaHandleId;

/// Stable key into [`Arena`]. Never transmitted on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

/// Owns every [`Track`] the session currently knows about, keyed by a
/// monotonically increasing [`TrackId`] that is never reused (§9).
#[derive(Debug, Default)]
pub struct Arena<T> {
    next: u64,
    entries: HashMap<TrackId, T>,
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { next: 0, entries: HashMap::new() }
    }

    pub fn insert(&mut self, value: T) -> TrackId {
        let id = TrackId(self.next);
        self.next += 1;
        self.entries.insert(id, value);
        id
    }

    #[must_use]
    pub fn get(&self, id: TrackId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: TrackId) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TrackId, &mut T)> {
        self.entries.iter_mut().map(|(id, v)| (*id, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A locally published (or about-to-be-published) track (§3 `LocalTrack`).
#[derive(Debug, Clone)]
pub struct LocalTrack {
    pub cid: Cid,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub encryption: EncryptionMode,
    /// Local app-driven mute flag.
    pub muted: bool,
    /// Server-reported mute, set by another participant's moderator
    /// action (§4.3 "Server-observed remote mute of a local track").
    pub remote_side_mute: bool,
    /// Empty until the first `JoinResponse`/`AddTrackResponse` names it.
    pub sid: Option<Sid>,
    /// Present only once the media engine has bound a sender whose
    /// local id equals `cid` (§3 invariant).
    pub sender: Option<MediaHandleId>,
    /// Additive hint recovered from `original_source/` (SPEC_FULL.md
    /// §3); meaningful only for `TrackKind::Video`.
    pub degradation_preference: Option<DegradationPreference>,
}

impl LocalTrack {
    #[must_use]
    pub fn new(cid: Cid, name: impl Into<String>, kind: TrackKind, source: TrackSource) -> Self {
        Self {
            cid,
            name: name.into(),
            kind,
            source,
            encryption: EncryptionMode::None,
            muted: false,
            remote_side_mute: false,
            sid: None,
            sender: None,
            degradation_preference: None,
        }
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.sid.is_some()
    }
}

/// A subscribed remote track (§3 `RemoteTrack`).
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    pub sid: Sid,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub encryption: EncryptionMode,
    /// Server-reported value at arrival time, never a local default
    /// (§3 invariant).
    pub muted: bool,
    pub receiver: Option<MediaHandleId>,
    /// Currently subscribed spatial/temporal layer, updated by
    /// `SubscribedQualityUpdate` (SPEC_FULL.md §3).
    pub subscribed_layer: Option<u8>,
}

/// §9's redesign: two tagged variants instead of a templated
/// `TrackImpl<TMediaDevice, TTrackApi>` hierarchy.
#[derive(Debug, Clone)]
pub enum Track {
    Local(LocalTrack),
    Remote(RemoteTrack),
}

impl Track {
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Local(t) => t.kind,
            Self::Remote(t) => t.kind,
        }
    }

    #[must_use]
    pub fn as_local(&self) -> Option<&LocalTrack> {
        match self {
            Self::Local(t) => Some(t),
            Self::Remote(_) => None,
        }
    }

    #[must_use]
    pub fn as_local_mut(&mut self) -> Option<&mut LocalTrack> {
        match self {
            Self::Local(t) => Some(t),
            Self::Remote(_) => None,
        }
    }

    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteTrack> {
        match self {
            Self::Remote(t) => Some(t),
            Self::Local(_) => None,
        }
    }

    #[must_use]
    pub fn as_remote_mut(&mut self) -> Option<&mut RemoteTrack> {
        match self {
            Self::Remote(t) => Some(t),
            Self::Local(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_keys_are_never_reused() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let b = arena.insert(2);
        assert_ne!(a, b);
    }

    #[test]
    fn local_track_unpublished_until_sid_assigned() {
        let track = LocalTrack::new(
            Cid::generate(),
            "mic",
            TrackKind::Audio,
            TrackSource::Microphone,
        );
        assert!(!track.is_published());
    }

    #[test]
    fn track_variant_accessors_are_mutually_exclusive() {
        let local = Track::Local(LocalTrack::new(
            Cid::generate(),
            "mic",
            TrackKind::Audio,
            TrackSource::Microphone,
        ));
        assert!(local.as_local().is_some());
        assert!(local.as_remote().is_none());
    }
}
