//! Identifier allocation with an explicit, rebindable sequence binding.
//!
//! Each logical task owns an [`IdAllocator`] (or shares one deliberately
//! through an `Arc`); the active sequence is bound on the allocator itself
//! rather than through ambient thread-local state, so the binding is visible
//! in signatures and controllable in tests. The default sequence is built
//! lazily by a factory on the first access that finds no binding, and the
//! same instance is reused for the allocator's lifetime.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use fenix_core::EntityId;
use tracing::debug;

use crate::{error::Result, sequence::Sequence};

type SequenceFactory = dyn Fn() -> Result<Arc<dyn Sequence>> + Send + Sync;

/// Hands out unique entity identifiers from a rebindable sequence source.
pub struct IdAllocator {
    default_factory: Box<SequenceFactory>,
    source: RwLock<Option<Arc<dyn Sequence>>>,
}

impl IdAllocator {
    /// Creates an allocator whose default sequence comes from `factory`.
    ///
    /// The factory runs on the first access that finds no bound source and
    /// its product is kept for the allocator's lifetime. A factory failure
    /// leaves the allocator unbound, so a later access tries again.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Sequence>> + Send + Sync + 'static,
    {
        Self {
            default_factory: Box::new(factory),
            source: RwLock::new(None),
        }
    }

    /// Creates an allocator pre-bound to the given sequence.
    pub fn with_source(source: Arc<dyn Sequence>) -> Self {
        let factory_source = source.clone();
        Self {
            default_factory: Box::new(move || Ok(factory_source.clone())),
            source: RwLock::new(Some(source)),
        }
    }

    /// Returns the next unique identifier from the active sequence.
    ///
    /// While the active sequence stays the same, no two calls return equal
    /// values.
    ///
    /// # Errors
    ///
    /// Propagates failures from the underlying sequence without retrying.
    pub fn next_id(&self) -> Result<EntityId> {
        let value = self.current_source()?.next_value()?;
        Ok(EntityId::from(value))
    }

    /// Rebinds the active sequence for this allocator.
    ///
    /// The new binding is visible to every thread sharing the allocator as
    /// soon as this call returns.
    pub fn set_source(&self, source: Arc<dyn Sequence>) {
        let mut guard = self.source.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(source);
        debug!("sequence source rebound");
    }

    /// Returns the active sequence, constructing the default on first
    /// access.
    ///
    /// # Errors
    ///
    /// Propagates errors from the default sequence factory.
    pub fn current_source(&self) -> Result<Arc<dyn Sequence>> {
        if let Some(source) = &*self.source.read().unwrap_or_else(PoisonError::into_inner) {
            return Ok(source.clone());
        }

        let mut guard = self.source.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(source) = &*guard {
            // Another thread installed the default between the read and
            // write locks.
            return Ok(source.clone());
        }

        let source = (self.default_factory)()?;
        *guard = Some(source.clone());
        debug!("default sequence source constructed");
        Ok(source)
    }
}

impl fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self
            .source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("IdAllocator").field("source_bound", &bound).finish()
    }
}
