//! # Active Outlet Cache
//!
//! The outlet list changes a few times a year but is read on every screen
//! load, so it is cached with a TTL.
//!
//! ## Cache States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   EMPTY ──get()──► fetch ──ok──► FRESH ──ttl elapsed──► STALE          │
//! │                      │                ▲                   │             │
//! │                      err              │                  get()          │
//! │                      │                └──────ok── fetch ◄─┘             │
//! │                      ▼                                    │             │
//! │                  error returned                          err            │
//! │                                                           ▼             │
//! │                                          stale value served + warn!     │
//! │                                          (FRESH again for one TTL)      │
//! │                                                                         │
//! │   invalidate(): FRESH ──► STALE (value kept as fallback)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time comes from an injected [`Clock`], so tests move it by hand with
//! [`ManualClock`] instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::error::SourceResult;
use crate::source::StockSource;

// =============================================================================
// Clock
// =============================================================================

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

// =============================================================================
// Outlet Cache
// =============================================================================

#[derive(Debug, Clone)]
struct Entry {
    outlets: Vec<String>,
    fetched_at: Instant,
    invalidated: bool,
}

/// TTL cache over [`StockSource::active_outlets`].
#[derive(Debug)]
pub struct OutletCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    // Held across the refresh so concurrent callers wait for one fetch
    entry: AsyncMutex<Option<Entry>>,
}

impl OutletCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> OutletCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entry: AsyncMutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_is_fresh(&self, entry: &Entry) -> bool {
        !entry.invalidated && self.clock.now().duration_since(entry.fetched_at) < self.ttl
    }

    /// True when a cached value exists and has not expired.
    pub async fn is_fresh(&self) -> bool {
        self.entry
            .lock()
            .await
            .as_ref()
            .is_some_and(|e| self.entry_is_fresh(e))
    }

    /// Returns the cached outlets, refreshing from `source` when stale.
    pub async fn get(&self, source: &dyn StockSource) -> SourceResult<Vec<String>> {
        let mut guard = self.entry.lock().await;

        if let Some(entry) = guard.as_ref().filter(|e| self.entry_is_fresh(e)) {
            return Ok(entry.outlets.clone());
        }

        match source.active_outlets().await {
            Ok(outlets) => {
                debug!(count = outlets.len(), "Active outlets refreshed");
                *guard = Some(Entry {
                    outlets: outlets.clone(),
                    fetched_at: self.clock.now(),
                    invalidated: false,
                });
                Ok(outlets)
            }
            Err(err) => match guard.as_mut() {
                Some(stale) => {
                    warn!(error = %err, "Outlet refresh failed, serving stale list");
                    // Next attempt waits one TTL from this failure
                    stale.fetched_at = self.clock.now();
                    stale.invalidated = false;
                    Ok(stale.outlets.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Forces the next `get` to refetch. The old value stays as a fallback.
    pub async fn invalidate(&self) {
        if let Some(entry) = self.entry.lock().await.as_mut() {
            entry.invalidated = true;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::memory::MemoryStockSource;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_serves_from_cache_within_ttl() {
        let source = MemoryStockSource::new().with_outlets(["A", "B"]);
        let clock = ManualClock::new();
        let cache = OutletCache::with_clock(TTL, clock.clone());

        assert_eq!(cache.get(&source).await.unwrap(), vec!["A", "B"]);
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A", "B"]);
        assert_eq!(source.outlet_calls(), 1);
        assert!(cache.is_fresh().await);
    }

    #[tokio::test]
    async fn test_refreshes_after_ttl() {
        let source = MemoryStockSource::new().with_outlets(["A"]);
        let clock = ManualClock::new();
        let cache = OutletCache::with_clock(TTL, clock.clone());

        cache.get(&source).await.unwrap();
        source.set_outlets(["A", "C"]);
        clock.advance(TTL);
        assert!(!cache.is_fresh().await);
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A", "C"]);
        assert_eq!(source.outlet_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = MemoryStockSource::new().with_outlets(["A"]);
        let cache = OutletCache::with_clock(TTL, ManualClock::new());

        cache.get(&source).await.unwrap();
        cache.invalidate().await;
        assert!(!cache.is_fresh().await);
        cache.get(&source).await.unwrap();
        assert_eq!(source.outlet_calls(), 2);
        assert!(cache.is_fresh().await);
    }

    #[tokio::test]
    async fn test_stale_value_served_on_refresh_failure() {
        let source = MemoryStockSource::new().with_outlets(["A"]);
        let clock = ManualClock::new();
        let cache = OutletCache::with_clock(TTL, clock.clone());

        cache.get(&source).await.unwrap();
        source.fail_outlets(Some(SourceError::Timeout(5)));
        clock.advance(TTL * 2);
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_backs_off_for_one_ttl() {
        let source = MemoryStockSource::new().with_outlets(["A"]);
        let clock = ManualClock::new();
        let cache = OutletCache::with_clock(TTL, clock.clone());

        cache.get(&source).await.unwrap();
        source.fail_outlets(Some(SourceError::Timeout(5)));
        clock.advance(TTL);
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A"]);
        assert_eq!(source.outlet_calls(), 2);

        // Upstream is not hit again until a TTL after the failure
        for _ in 0..5 {
            assert_eq!(cache.get(&source).await.unwrap(), vec!["A"]);
        }
        clock.advance(TTL - Duration::from_secs(1));
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A"]);
        assert_eq!(source.outlet_calls(), 2);

        source.fail_outlets(None);
        source.set_outlets(["A", "B"]);
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&source).await.unwrap(), vec!["A", "B"]);
        assert_eq!(source.outlet_calls(), 3);
    }

    #[tokio::test]
    async fn test_error_propagates_without_value() {
        let source = MemoryStockSource::new();
        source.fail_outlets(Some(SourceError::Unauthorized));
        let cache = OutletCache::with_clock(TTL, ManualClock::new());

        assert_eq!(cache.get(&source).await, Err(SourceError::Unauthorized));
        assert!(!cache.is_fresh().await);
    }
}
