//! Lock-guarded single-value timeline store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::data::{FetchError, Fetcher, Timeline};

/// A timeline together with the moment it was fetched
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The timeline as fetched; never modified after installation
    pub timeline: Arc<Timeline>,
    /// When the fetch that produced it completed
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    fn new(timeline: Timeline) -> Self {
        Self {
            timeline: Arc::new(timeline),
            fetched_at: Utc::now(),
        }
    }
}

/// Holds the current timeline and replaces it on successful refreshes
///
/// Readers and the writer share one mutex, held only long enough to clone
/// or swap an `Arc`. Concurrent refreshes each run their own fetch; the
/// last one to finish successfully wins.
pub struct SnapshotCache {
    fetcher: Fetcher,
    current: Mutex<Snapshot>,
}

impl SnapshotCache {
    /// Runs the first fetch and builds the cache from it.
    ///
    /// There is no empty cache: if this fetch fails the error is returned
    /// and no cache exists.
    pub async fn initialize(fetcher: Fetcher) -> Result<Self, FetchError> {
        let timeline = fetcher.fetch_timeline().await?;
        tracing::info!(
            events = timeline.events.len(),
            eras = timeline.eras.len(),
            "initial timeline loaded"
        );

        Ok(Self {
            fetcher,
            current: Mutex::new(Snapshot::new(timeline)),
        })
    }

    /// Returns the current timeline.
    pub fn get(&self) -> Arc<Timeline> {
        self.current.lock().timeline.clone()
    }

    /// Returns the current timeline along with its fetch time.
    pub fn snapshot(&self) -> Snapshot {
        self.current.lock().clone()
    }

    /// Fetches a new timeline and installs it.
    ///
    /// On failure the current snapshot stays in place and the error is
    /// returned unchanged.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let timeline = match self.fetcher.fetch_timeline().await {
            Ok(timeline) => timeline,
            Err(e) => {
                tracing::warn!(error = %e, "timeline refresh failed; keeping previous snapshot");
                return Err(e);
            }
        };

        let (events, eras) = (timeline.events.len(), timeline.eras.len());
        let snapshot = Snapshot::new(timeline);
        // Old snapshot is released after the guard, outside the lock.
        let previous = std::mem::replace(&mut *self.current.lock(), snapshot);
        drop(previous);

        tracing::info!(events, eras, "timeline snapshot replaced");
        Ok(())
    }
}
