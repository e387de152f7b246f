use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BatchJob, BatchStatus, ProgressTracker};

/// Number of batches kept addressable by job id, the running one included
pub const DEFAULT_RETAINED_JOBS: usize = 8;

/// Keeps the most recent batches started in this process, addressable by job id.
///
/// Batch starts are serialized: a new batch is refused until the most recent
/// one has completed. A tracker handed out by [`JobRegistry::start`] counts as
/// claimed even before its batch resets it. Once more than `retain` batches
/// exist, the oldest completed ones are forgotten.
#[derive(Debug)]
pub struct JobRegistry {
    retain: usize,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<Uuid, ProgressTracker>,
    /// Job ids, oldest first
    order: VecDeque<Uuid>,
    latest: Option<Uuid>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_JOBS)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry keeping at most `retain` batches (at least the latest one)
    pub fn with_retention(retain: usize) -> Self {
        Self {
            retain: retain.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a fresh tracker for a new batch, or `None` while another batch is unfinished
    pub async fn start(&self) -> Option<ProgressTracker> {
        let mut inner = self.inner.write().await;

        if let Some(latest) = inner.latest.and_then(|id| inner.jobs.get(&id)) {
            if latest.status().await != BatchStatus::Completed {
                return None;
            }
        }

        let tracker = ProgressTracker::new();
        inner.jobs.insert(tracker.id(), tracker.clone());
        inner.order.push_back(tracker.id());
        inner.latest = Some(tracker.id());

        // everything but the new tracker is completed here
        while inner.order.len() > self.retain {
            if let Some(evicted) = inner.order.pop_front() {
                inner.jobs.remove(&evicted);
                tracing::debug!("Dropped finished batch {}", evicted);
            }
        }

        Some(tracker)
    }

    pub async fn get(&self, id: Uuid) -> Option<ProgressTracker> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    /// Snapshot of the most recent batch, or an idle record when none ran yet
    pub async fn latest_snapshot(&self) -> BatchJob {
        let tracker = {
            let inner = self.inner.read().await;
            inner.latest.and_then(|id| inner.jobs.get(&id).cloned())
        };

        match tracker {
            Some(tracker) => tracker.snapshot().await,
            None => BatchJob::idle(Uuid::nil()),
        }
    }
}
