//! Order storage backends.
//!
//! [`MemoryStore`] is the primary store: a process-local map that every transition reads and writes under
//! the flow API's per-order locks. It can be paired with an [`crate::traits::OrderMirror`] for write-behind
//! crash recovery; [`NullMirror`] disables mirroring.
mod memory;

pub use memory::{MemoryStore, NullMirror};
