//! varclass-cache — Validated, TTL-based cache for provider responses.
//!
//! Entries are keyed by (category, source, variant identity, schema version)
//! and stored as one JSON file each under
//! `{root}/{category}/{source}/{digest}.json`.
//!
//! An entry is only ever returned if it is unexpired, its stored key matches
//! the requested key, and its payload passes the category validator. Anything
//! else is indistinguishable from a miss and the file is purged. All
//! read/validate/delete and validate/write sequences for one key run under a
//! per-key async lock; distinct keys never contend.

pub mod clock;
pub mod error;
pub mod key;
pub mod locks;
pub mod store;
pub mod ttl;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use key::CacheKey;
pub use store::{CacheEntry, CacheStats, ValidatedCache};
pub use ttl::CacheTtls;
pub use validator::{FactValidator, PayloadValidator};
