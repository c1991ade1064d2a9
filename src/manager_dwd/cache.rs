use std::sync::{Arc, RwLock};
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use crate::clock::Clock;
use crate::manager_dwd::SnapshotSource;
use crate::models::weather::WeatherSnapshot;

struct CacheEntry {
    fetched_at: DateTime<Utc>,
    snapshot: Arc<WeatherSnapshot>,
}

/// Time bounded cache in front of a snapshot source
///
/// Readers only hold the lock long enough to clone an Arc, the fetch itself runs
/// unlocked so concurrent callers on an expired entry may each fetch.
pub struct WeatherCache<S: SnapshotSource, C: Clock> {
    source: S,
    clock: C,
    ttl: TimeDelta,
    entry: RwLock<Option<CacheEntry>>,
}

impl<S: SnapshotSource, C: Clock> WeatherCache<S, C> {
    /// Returns an empty WeatherCache
    ///
    /// # Arguments
    ///
    /// * 'source' - where snapshots come from
    /// * 'clock' - clock used for aging entries
    /// * 'ttl' - how long a snapshot is served before it is fetched again
    pub fn new(source: S, clock: C, ttl: TimeDelta) -> Self {
        Self { source, clock, ttl, entry: RwLock::new(None) }
    }

    /// Returns the cached snapshot if it is younger than the ttl, otherwise a freshly fetched one
    pub fn get(&self) -> Arc<WeatherSnapshot> {
        if let Some(snapshot) = self.cached(self.clock.now()) {
            return snapshot;
        }

        debug!("weather cache miss, fetching");
        let snapshot = Arc::new(self.source.fetch());

        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CacheEntry { fetched_at: self.clock.now(), snapshot: snapshot.clone() });

        snapshot
    }

    fn cached(&self, now: DateTime<Utc>) -> Option<Arc<WeatherSnapshot>> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());

        entry.as_ref()
            .filter(|e| now - e.fetched_at < self.ttl)
            .map(|e| e.snapshot.clone())
    }
}
