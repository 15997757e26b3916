//! Quire Cache System
//!
//! A single in-process store with per-entry time-to-live that sits in front
//! of the Notion API. Two keyspaces share the store:
//!
//! - `page_<id>`: full record maps returned by a page fetch
//! - `user_<id>`: normalized user records resolved from person properties
//!
//! Expiry is lazy. Nothing sweeps the store in the background; a stale entry
//! is dropped the first time it is read after its deadline.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! ttl_seconds = 300
//! ```

mod clock;
mod config;
mod keys;
mod lock;
mod store;

use std::sync::Arc;

use crate::domain::post::User;
use crate::domain::record_map::RecordMap;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_TTL_MS};
pub use keys::CacheKey;
pub use store::ExpiringCache;

/// Names of the counters the store increments.
pub mod metric_names {
    pub use super::store::{EXPIRED_TOTAL, HIT_TOTAL, MISS_TOTAL};
}

/// Values stored in the shared Notion cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Page(Arc<RecordMap>),
    User(User),
}

/// The process-wide cache shared by the page and user fetchers.
pub type NotionCache = ExpiringCache<CachedValue>;
