//! Per-video loop persistence.
//!
//! [`KeyValueStore`] is the raw backing store (an origin-wide string map);
//! [`LoopStore`] layers the loop record format, TTL eviction and the
//! "never fail the caller" policy on top of it.

mod kv;
mod loop_store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use loop_store::{LoopStore, PersistedLoopState};
