//! Uniqueness guarantees for identifier sequences under varied usage.

use std::{collections::HashSet, sync::Arc, thread};

use fenix_entity::{
    BlockSequence, CounterSequence, IdAllocator, InMemorySequenceStore, Sequence,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn counter_sequence_never_repeats(start in -1_000_000i64..1_000_000, count in 1usize..512) {
        let sequence = CounterSequence::new(start);

        let mut seen = HashSet::new();
        for _ in 0..count {
            let value = sequence.next_value().expect("counter sequence cannot fail");
            prop_assert!(seen.insert(value), "value {value} issued twice");
        }
    }

    #[test]
    fn block_sequence_never_repeats(block_size in 1u32..64, count in 1usize..512) {
        let store = Arc::new(InMemorySequenceStore::new());
        let sequence = BlockSequence::new("entities", store, block_size)
            .expect("valid configuration");

        let mut seen = HashSet::new();
        for _ in 0..count {
            let value = sequence.next_value().expect("in-memory store cannot fail");
            prop_assert!(seen.insert(value), "value {value} issued twice");
        }
    }
}

#[test]
fn concurrent_allocation_yields_distinct_ids() {
    let store = Arc::new(InMemorySequenceStore::new());
    let sequence = Arc::new(BlockSequence::new("entities", store, 8).expect("valid configuration"));
    let allocator = Arc::new(IdAllocator::with_source(sequence));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let allocator = allocator.clone();
            thread::spawn(move || {
                (0..250)
                    .map(|_| allocator.next_id().expect("allocation succeeds").value())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for value in handle.join().expect("allocation thread panicked") {
            assert!(seen.insert(value), "identifier {value} allocated twice");
        }
    }
    assert_eq!(seen.len(), 8 * 250);
}

#[test]
fn sequences_on_separate_store_counters_may_overlap() {
    let store = Arc::new(InMemorySequenceStore::new());
    let entities = BlockSequence::new("entities", store.clone(), 10).expect("valid configuration");
    let messages = BlockSequence::new("messages", store, 10).expect("valid configuration");

    // Independent counters both start at 1; uniqueness holds per counter.
    assert_eq!(entities.next_value().unwrap(), 1);
    assert_eq!(messages.next_value().unwrap(), 1);
}
