//! # Response Cache
//!
//! Memoizes `(dataset fingerprints, question) → result` so a repeated
//! question costs neither a model call nor an execution.
//!
//! # Guarantees
//!
//! 1. At most one computation per key is in flight
//! 2. No lookup returns a result computed from a dataset version that has
//!    since been replaced
//! 3. Failures are never cached
//! 4. No time-based expiry; only fingerprint changes evict

mod key;
mod response;

pub use crate::executor::CacheStatus;
pub use key::{normalize_question, CacheKey};
pub use response::{CacheEntry, CacheEntryInfo, CacheStats, ResponseCache};
