//! Cache configuration.

use std::time::Duration;

/// Default time-to-live applied by [`super::ExpiringCache::set`]: five minutes.
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a caller does not pick one.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            default_ttl: settings.ttl,
        }
    }
}

impl CacheConfig {
    /// Default TTL in whole milliseconds, saturating at `i64::MAX`.
    pub(crate) fn default_ttl_ms(&self) -> i64 {
        ttl_to_ms(self.default_ttl)
    }
}

pub(crate) fn ttl_to_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_five_minutes() {
        assert_eq!(CacheConfig::default().default_ttl_ms(), 300_000);
    }

    #[test]
    fn huge_ttl_saturates() {
        assert_eq!(ttl_to_ms(Duration::MAX), i64::MAX);
    }
}
