//! Lazily-evaluated field values with a staleness policy.
//!
//! A [`Lazy`] wraps a getter behind a cache and a time-to-live. The core
//! engines only ever read through [`Lazy::read`], never the raw getter; a
//! read that recomputes hands back a *new* wrapper for the embedding record
//! to assign. Two readers racing on a stale value therefore each produce an
//! independently owned wrapper and the last assignment wins — last-write-
//! wins at the record level, never a data race on shared memory.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// When a cached value stops being trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Compute once, cache forever.
    Never,
    /// Recompute when the cached value is older than the given duration.
    Ttl(Duration),
}

/// A deferred value: getter, staleness policy, last-computed timestamp and
/// cached result. Created empty; the first read computes and stamps.
#[derive(Clone)]
pub struct Lazy<T> {
    getter: Arc<dyn Fn() -> T + Send + Sync>,
    policy: Staleness,
    computed_at: Option<DateTime<Utc>>,
    cached: Option<T>,
}

impl<T: Clone> Lazy<T> {
    pub fn new<F>(policy: Staleness, getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            getter: Arc::new(getter),
            policy,
            computed_at: None,
            cached: None,
        }
    }

    /// Whether the next [`read`](Self::read) would recompute at `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.cached, self.computed_at) {
            (None, _) | (_, None) => true,
            (Some(_), Some(at)) => match self.policy {
                Staleness::Never => false,
                Staleness::Ttl(ttl) => now - at >= ttl,
            },
        }
    }

    /// Resolve the current value. Returns the value and, when the read had
    /// to recompute, a replacement wrapper carrying the fresh cache — the
    /// caller assigns it (or drops it, keeping the stale one).
    pub fn read(&self) -> (T, Option<Self>) {
        self.read_at(Utc::now())
    }

    /// [`read`](Self::read) with an explicit clock, for deterministic tests.
    pub fn read_at(&self, now: DateTime<Utc>) -> (T, Option<Self>) {
        if !self.is_stale_at(now) {
            if let Some(v) = &self.cached {
                return (v.clone(), None);
            }
        }
        let value = (self.getter)();
        let fresh = Self {
            getter: Arc::clone(&self.getter),
            policy: self.policy,
            computed_at: Some(now),
            cached: Some(value.clone()),
        };
        (value, Some(fresh))
    }

    /// Timestamp of the cached value, if any.
    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.computed_at
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("policy", &self.policy)
            .field("computed_at", &self.computed_at)
            .field("cached", &self.cached.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter_lazy(policy: Staleness) -> (Arc<AtomicU32>, Lazy<u32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let lazy = Lazy::new(policy, move || c.fetch_add(1, Ordering::SeqCst) + 1);
        (calls, lazy)
    }

    #[test]
    fn first_read_computes_and_stamps() {
        let (calls, lazy) = counter_lazy(Staleness::Never);
        assert!(lazy.computed_at().is_none());
        let (v, fresh) = lazy.read();
        assert_eq!(v, 1);
        let fresh = fresh.expect("first read must recompute");
        assert!(fresh.computed_at().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cached_value_survives_until_ttl() {
        let (calls, lazy) = counter_lazy(Staleness::Ttl(Duration::seconds(60)));
        let t0 = Utc::now();
        let (_, fresh) = lazy.read_at(t0);
        let lazy = fresh.unwrap();

        let (v, again) = lazy.read_at(t0 + Duration::seconds(30));
        assert_eq!(v, 1);
        assert!(again.is_none(), "fresh value must come from cache");

        let (v, again) = lazy.read_at(t0 + Duration::seconds(61));
        assert_eq!(v, 2);
        assert!(again.is_some(), "stale value must recompute");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn never_policy_caches_forever() {
        let (calls, lazy) = counter_lazy(Staleness::Never);
        let t0 = Utc::now();
        let (_, fresh) = lazy.read_at(t0);
        let lazy = fresh.unwrap();
        for days in 1..=5 {
            let (v, again) = lazy.read_at(t0 + Duration::days(days));
            assert_eq!(v, 1);
            assert!(again.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_readers_each_get_an_independent_wrapper() {
        let (_, lazy) = counter_lazy(Staleness::Ttl(Duration::seconds(1)));
        let t0 = Utc::now();
        // both readers see the same stale wrapper
        let (v1, w1) = lazy.read_at(t0);
        let (v2, w2) = lazy.read_at(t0);
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        // whichever wrapper the record assigns last wins; both are valid
        assert!(w1.unwrap().computed_at().is_some());
        assert!(w2.unwrap().computed_at().is_some());
    }
}
