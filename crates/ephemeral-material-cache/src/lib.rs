//! In-memory material cache with single-use retrieval and TTL eviction
//!
//! Entries are stored under a generated id, handed out at most once by
//! [`MaterialCache::take`], and evicted by a timer when nobody claims them.

mod cache;
mod error;
mod types;

pub use cache::{MaterialCache, DEFAULT_TAG, DEFAULT_TTL};
pub use error::{CacheError, Result};
pub use types::{CacheEntry, CacheStats, NewMaterial};
