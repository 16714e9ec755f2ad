// ── Time-bounded value cache ──
//
// Holds a single value for a fixed TTL. Uses tokio's clock so paused-time
// tests can expire entries with `tokio::time::advance`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

pub(crate) struct TtlCache<T> {
    ttl: Duration,
    entry: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The cached value, if present and younger than the TTL.
    pub(crate) fn get(&self) -> Option<T> {
        let guard = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some((stored, value)) if stored.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn put(&self, value: T) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some((Instant::now(), value));
    }

    pub(crate) fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(600));
        cache.put(vec![1, 2, 3]);
        assert_eq!(cache.get(), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(cache.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_drops_entry() {
        let cache = TtlCache::new(Duration::from_secs(600));
        cache.put("x");
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }
}
