//! Tagged TTL cache fronting all read paths
//!
//! Advisory by design: every consumer pairs a cache key with a direct
//! fetch fallback, so a cold or evicted cache degrades to direct reads
//! and never fails a request.

pub mod keys;
mod service;

pub use service::{CacheService, CacheStats};
