//! Root job status, as read by the API layer.

use feedline_core::ResourceId;
use feedline_core::job::Job;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Default)]
struct Entries {
    jobs: HashMap<ResourceId, Job>,
    order: VecDeque<ResourceId>,
}

/// Keeps the most recent root jobs, oldest evicted first.
pub struct JobTracker {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Insert or replace the snapshot of a root job.
    pub async fn record(&self, job: &Job) {
        let mut entries = self.entries.write().await;
        if entries.jobs.insert(job.id, job.clone()).is_none() {
            entries.order.push_back(job.id);
        }
        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.jobs.remove(&evicted);
            }
        }
    }

    pub async fn get(&self, id: ResourceId) -> Option<Job> {
        self.entries.read().await.jobs.get(&id).cloned()
    }

    /// Most recently started root job for a feed source.
    pub async fn latest_for_feed_source(&self, feed_source_id: ResourceId) -> Option<Job> {
        let entries = self.entries.read().await;
        entries
            .order
            .iter()
            .rev()
            .filter_map(|id| entries.jobs.get(id))
            .find(|job| job.feed_source_id == Some(feed_source_id))
            .cloned()
    }

    /// Jobs not yet in a terminal state.
    pub async fn active(&self) -> Vec<Job> {
        let entries = self.entries.read().await;
        entries
            .order
            .iter()
            .filter_map(|id| entries.jobs.get(id))
            .filter(|job| !job.status.state.is_terminal())
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.jobs.len()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
