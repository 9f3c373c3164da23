//! Entity identity allocation for the fenix domain model.
//!
//! Domain entities receive a unique numeric identifier when they are
//! constructed, before any persistence collaborator sees them, without
//! resorting to UUIDs. Identifiers come from a [`Sequence`] bound to an
//! [`IdAllocator`]; the binding is explicit and per allocator instance, so
//! each logical task controls which sequence its entities draw from and
//! tests can install their own.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use fenix_entity::{BlockSequence, EntityIdentity, IdAllocator, InMemorySequenceStore};
//!
//! # fn example() -> Result<(), fenix_entity::SequenceError> {
//! let store = Arc::new(InMemorySequenceStore::new());
//! let allocator = IdAllocator::with_source(Arc::new(BlockSequence::with_defaults(store)));
//!
//! let identity = EntityIdentity::allocate(&allocator)?;
//! let another = EntityIdentity::allocate(&allocator)?;
//! assert_ne!(identity.id(), another.id());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod entity;
pub mod error;
pub mod sequence;

pub use allocator::IdAllocator;
pub use entity::EntityIdentity;
pub use error::{Result, SequenceError};
pub use sequence::{
    BlockSequence, CounterSequence, InMemorySequenceStore, Sequence, SequenceStore,
    DEFAULT_BLOCK_SIZE, DEFAULT_SEQUENCE_NAME,
};
