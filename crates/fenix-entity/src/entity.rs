//! Entity identity with early identifier assignment and optimistic locking.

use fenix_core::{EntityId, LockVersion};

use crate::{allocator::IdAllocator, error::Result};

/// Identifier and optimistic-lock version embedded by domain entities.
///
/// The identifier is assigned at construction time, so entities are
/// addressable and comparable before anything is persisted. Two identities
/// are equal only when both the identifier and the version match; a stale
/// copy of an entity therefore compares unequal to its updated counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityIdentity {
    id: EntityId,
    version: LockVersion,
}

impl EntityIdentity {
    /// Allocates a fresh identity from the allocator's active sequence.
    ///
    /// # Errors
    ///
    /// Propagates allocation failures from the underlying sequence source;
    /// the entity under construction should fail with them.
    pub fn allocate(allocator: &IdAllocator) -> Result<Self> {
        let id = allocator.next_id()?;
        Ok(Self { id, version: LockVersion::initial() })
    }

    /// Reconstructs an identity from persisted values.
    pub fn from_parts(id: EntityId, version: LockVersion) -> Self {
        Self { id, version }
    }

    /// Returns the entity identifier.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the current lock version.
    pub fn version(&self) -> LockVersion {
        self.version
    }

    /// Advances the lock version after a committed update and returns the
    /// new version.
    pub fn bump_version(&mut self) -> LockVersion {
        self.version = self.version.next();
        self.version
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sequence::CounterSequence;

    fn test_allocator() -> IdAllocator {
        IdAllocator::with_source(Arc::new(CounterSequence::default()))
    }

    #[test]
    fn allocate_assigns_distinct_ids() {
        let allocator = test_allocator();

        let first = EntityIdentity::allocate(&allocator).unwrap();
        let second = EntityIdentity::allocate(&allocator).unwrap();

        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn fresh_identity_starts_at_version_zero() {
        let allocator = test_allocator();
        let identity = EntityIdentity::allocate(&allocator).unwrap();

        assert_eq!(identity.version(), LockVersion::initial());
    }

    #[test]
    fn bump_version_advances_by_one() {
        let allocator = test_allocator();
        let mut identity = EntityIdentity::allocate(&allocator).unwrap();

        assert_eq!(identity.bump_version().value(), 1);
        assert_eq!(identity.bump_version().value(), 2);
        assert_eq!(identity.version().value(), 2);
    }

    #[test]
    fn stale_copy_compares_unequal_after_update() {
        let allocator = test_allocator();
        let mut identity = EntityIdentity::allocate(&allocator).unwrap();
        let stale = identity;

        identity.bump_version();

        assert_eq!(identity.id(), stale.id());
        assert_ne!(identity, stale);
    }

    #[test]
    fn from_parts_restores_persisted_identity() {
        let identity = EntityIdentity::from_parts(EntityId::from(42), LockVersion::from(3));

        assert_eq!(identity.id().value(), 42);
        assert_eq!(identity.version().value(), 3);
    }
}
