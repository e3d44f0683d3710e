//! UUID generator collaborator (§6: "produces a URL-safe 128-bit
//! identifier used as CID").

use nova_protocol::Cid;

/// Mints a fresh [`Cid`]. A trait (rather than a bare function call)
/// so tests can substitute deterministic CIDs.
pub trait UuidGenerator: Send + Sync {
    fn generate(&self) -> Cid;
}

/// Default implementation, delegating to [`Cid::generate`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUuidGenerator;

impl UuidGenerator for DefaultUuidGenerator {
    fn generate(&self) -> Cid {
        Cid::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generator_produces_distinct_cids() {
        let gen = DefaultUuidGenerator;
        assert_ne!(gen.generate(), gen.generate());
    }
}
