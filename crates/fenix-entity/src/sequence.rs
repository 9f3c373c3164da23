//! Sequence sources for unique identifier generation.
//!
//! A [`Sequence`] hands out numeric values that never repeat while the same
//! source stays active. [`CounterSequence`] is a plain in-process counter
//! for tests and single-process deployments; [`BlockSequence`] reserves
//! blocks of values from a named counter in a [`SequenceStore`], so
//! identifiers stay unique across processes sharing the store while most
//! allocations are served locally.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tracing::debug;

use crate::error::{Result, SequenceError};

/// Default store counter name for entity identifiers.
pub const DEFAULT_SEQUENCE_NAME: &str = "entity_id";

/// Default number of values reserved from the store per round trip.
pub const DEFAULT_BLOCK_SIZE: u32 = 50;

/// Source of unique numeric identifier values.
///
/// As long as the same instance stays in use, two calls never return equal
/// values. Implementations are safe to share across threads.
pub trait Sequence: Send + Sync + fmt::Debug {
    /// Returns the next value.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::StoreUnavailable` when a backing store cannot
    /// serve the request. No retry is attempted.
    fn next_value(&self) -> Result<i64>;
}

/// In-process atomic counter sequence.
#[derive(Debug)]
pub struct CounterSequence {
    counter: AtomicI64,
}

impl CounterSequence {
    /// Creates a counter sequence whose first value is `start`.
    pub fn new(start: i64) -> Self {
        Self { counter: AtomicI64::new(start) }
    }
}

impl Default for CounterSequence {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Sequence for CounterSequence {
    fn next_value(&self) -> Result<i64> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

/// Named counter store that block sequences reserve values from.
///
/// This is the seam to the persistence collaborator. Production deployments
/// back it with a datastore counter; tests and single-process setups use
/// [`InMemorySequenceStore`].
pub trait SequenceStore: Send + Sync + fmt::Debug {
    /// Reserves `count` consecutive values from the named counter and
    /// returns the first value of the reserved block.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::StoreUnavailable` when the store cannot be
    /// reached or the reservation fails.
    fn reserve(&self, name: &str, count: u32) -> Result<i64>;
}

/// In-memory sequence store keyed by counter name.
///
/// Counters start at 1 on their first reservation.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    counters: Mutex<HashMap<String, i64>>,
}

impl InMemorySequenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn reserve(&self, name: &str, count: u32) -> Result<i64> {
        // Counters only grow; a poisoned lock still holds usable state.
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let next = counters.entry(name.to_string()).or_insert(1);
        let first = *next;
        *next += i64::from(count);
        Ok(first)
    }
}

/// Sequence that reserves blocks of values from a [`SequenceStore`].
///
/// One store round trip covers `block_size` identifiers; values inside the
/// current block are handed out locally. Values left unused when a process
/// stops mid-block are never reissued, which preserves uniqueness across
/// restarts at the cost of gaps in the identifier space.
#[derive(Debug)]
pub struct BlockSequence {
    name: String,
    block_size: u32,
    store: Arc<dyn SequenceStore>,
    state: Mutex<BlockState>,
}

#[derive(Debug)]
struct BlockState {
    next: i64,
    remaining: u32,
}

impl BlockSequence {
    /// Creates a block sequence over the named store counter.
    ///
    /// # Errors
    ///
    /// Returns `SequenceError::Configuration` for an empty name or a zero
    /// block size.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn SequenceStore>,
        block_size: u32,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SequenceError::configuration("sequence name is empty"));
        }
        if block_size == 0 {
            return Err(SequenceError::configuration("block size must be at least 1"));
        }

        Ok(Self {
            name,
            block_size,
            store,
            state: Mutex::new(BlockState { next: 0, remaining: 0 }),
        })
    }

    /// Creates a block sequence with the default counter name and block
    /// size.
    pub fn with_defaults(store: Arc<dyn SequenceStore>) -> Self {
        Self {
            name: DEFAULT_SEQUENCE_NAME.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
            store,
            state: Mutex::new(BlockState { next: 0, remaining: 0 }),
        }
    }

    /// Name of the store counter this sequence draws from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Sequence for BlockSequence {
    fn next_value(&self) -> Result<i64> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.remaining == 0 {
            let first = self.store.reserve(&self.name, self.block_size)?;
            debug!(
                sequence = %self.name,
                first_value = first,
                block_size = self.block_size,
                "reserved identifier block"
            );
            state.next = first;
            state.remaining = self.block_size;
        }

        let value = state.next;
        state.next += 1;
        state.remaining -= 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingStore {
        inner: InMemorySequenceStore,
        reservations: AtomicUsize,
    }

    impl SequenceStore for CountingStore {
        fn reserve(&self, name: &str, count: u32) -> Result<i64> {
            self.reservations.fetch_add(1, Ordering::SeqCst);
            self.inner.reserve(name, count)
        }
    }

    #[derive(Debug)]
    struct FailingStore;

    impl SequenceStore for FailingStore {
        fn reserve(&self, _name: &str, _count: u32) -> Result<i64> {
            Err(SequenceError::store_unavailable("connection refused"))
        }
    }

    #[test]
    fn counter_sequence_yields_distinct_values() {
        let sequence = CounterSequence::new(10);

        assert_eq!(sequence.next_value().unwrap(), 10);
        assert_eq!(sequence.next_value().unwrap(), 11);
        assert_eq!(sequence.next_value().unwrap(), 12);
    }

    #[test]
    fn in_memory_store_advances_per_counter() {
        let store = InMemorySequenceStore::new();

        assert_eq!(store.reserve("entities", 50).unwrap(), 1);
        assert_eq!(store.reserve("entities", 50).unwrap(), 51);
        assert_eq!(store.reserve("messages", 10).unwrap(), 1);
        assert_eq!(store.reserve("entities", 50).unwrap(), 101);
    }

    #[test]
    fn block_sequence_reserves_only_when_block_exhausted() {
        let store = Arc::new(CountingStore::default());
        let sequence = BlockSequence::new("entities", store.clone(), 3).unwrap();

        for expected in 1..=3 {
            assert_eq!(sequence.next_value().unwrap(), expected);
        }
        assert_eq!(store.reservations.load(Ordering::SeqCst), 1);

        assert_eq!(sequence.next_value().unwrap(), 4);
        assert_eq!(store.reservations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn block_sequence_rejects_invalid_configuration() {
        let store: Arc<dyn SequenceStore> = Arc::new(InMemorySequenceStore::new());

        let result = BlockSequence::new("  ", store.clone(), 50);
        assert!(matches!(result, Err(SequenceError::Configuration { .. })));

        let result = BlockSequence::new("entities", store, 0);
        assert!(matches!(result, Err(SequenceError::Configuration { .. })));
    }

    #[test]
    fn store_failure_propagates_without_retry() {
        let sequence = BlockSequence::new("entities", Arc::new(FailingStore), 50).unwrap();

        let result = sequence.next_value();
        assert!(matches!(result, Err(SequenceError::StoreUnavailable { .. })));
    }

    #[test]
    fn with_defaults_uses_entity_counter() {
        let store = Arc::new(InMemorySequenceStore::new());
        let sequence = BlockSequence::with_defaults(store);

        assert_eq!(sequence.name(), DEFAULT_SEQUENCE_NAME);
        assert_eq!(sequence.next_value().unwrap(), 1);
    }
}
