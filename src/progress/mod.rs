use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::summarize::GeneratedSummary;
use crate::TranscriptorError;

pub mod registry;

pub use registry::JobRegistry;

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Processing,
    Completed,
}

/// Summary attached to a successful item.
///
/// Kept typed until serialization, where a failed generation becomes its
/// user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Generated { text: String, model: String },
    Failed(TranscriptorError),
}

impl Summary {
    pub fn text(&self) -> String {
        match self {
            Summary::Generated { text, .. } => text.clone(),
            Summary::Failed(error) => error.to_string(),
        }
    }

    /// Backend model that produced the summary
    pub fn model(&self) -> Option<&str> {
        match self {
            Summary::Generated { model, .. } => Some(model),
            Summary::Failed(_) => None,
        }
    }
}

impl From<std::result::Result<GeneratedSummary, TranscriptorError>> for Summary {
    fn from(outcome: std::result::Result<GeneratedSummary, TranscriptorError>) -> Self {
        match outcome {
            Ok(summary) => Summary::Generated {
                text: summary.text,
                model: summary.model,
            },
            Err(error) => Summary::Failed(error),
        }
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

/// Outcome for one input URL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemResult {
    Success {
        url: String,
        video_id: String,
        language: String,
        transcript: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<Summary>,
    },
    Failure {
        url: String,
        error: String,
    },
}

impl ItemResult {
    pub fn failure(url: impl Into<String>, error: &TranscriptorError) -> Self {
        ItemResult::Failure {
            url: url.into(),
            error: error.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ItemResult::Success { url, .. } | ItemResult::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }
}

/// State of one batch as seen by pollers
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    pub job_id: Uuid,
    pub status: BatchStatus,
    pub current_video: Option<String>,
    pub total: usize,
    pub results: Vec<ItemResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn idle(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: BatchStatus::Idle,
            current_video: None,
            total: 0,
            results: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Shared handle to a batch's progress.
///
/// The pipeline is the only writer; any number of clones can read snapshots
/// while the batch runs.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    id: Uuid,
    state: Arc<RwLock<BatchJob>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            state: Arc::new(RwLock::new(BatchJob::idle(id))),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start a batch of `total` items: clears results and enters `processing`
    pub async fn reset(&self, total: usize) {
        let mut job = self.state.write().await;
        job.status = BatchStatus::Processing;
        job.current_video = None;
        job.total = total;
        job.results.clear();
        job.started_at = Some(Utc::now());
        job.completed_at = None;
    }

    /// Record the URL currently in flight
    pub async fn set_current(&self, url: &str) {
        let mut job = self.state.write().await;
        if job.status != BatchStatus::Processing {
            tracing::warn!("Ignoring current item {} for a batch that is not processing", url);
            return;
        }
        job.current_video = Some(url.to_string());
    }

    /// Append one item result, keeping input order
    pub async fn append(&self, result: ItemResult) {
        let mut job = self.state.write().await;
        if job.status != BatchStatus::Processing {
            tracing::warn!("Ignoring result for {}: batch is not processing", result.url());
            return;
        }
        if job.results.len() >= job.total {
            tracing::warn!("Ignoring result for {}: batch already has {} results", result.url(), job.total);
            return;
        }
        job.results.push(result);
    }

    /// Attach a summary to an already recorded success. Failures stay untouched.
    pub async fn attach_summary(&self, index: usize, summary: Summary) {
        let mut job = self.state.write().await;
        if job.status != BatchStatus::Processing {
            tracing::warn!("Ignoring summary for item {}: batch is not processing", index);
            return;
        }
        match job.results.get_mut(index) {
            Some(ItemResult::Success { summary: slot, .. }) => *slot = Some(summary),
            Some(ItemResult::Failure { url, .. }) => {
                tracing::warn!("Ignoring summary for failed item {}", url);
            }
            None => tracing::warn!("Ignoring summary for unknown item {}", index),
        }
    }

    /// Finish the batch
    pub async fn mark_completed(&self) {
        let mut job = self.state.write().await;
        job.status = BatchStatus::Completed;
        job.current_video = None;
        job.completed_at = Some(Utc::now());
    }

    /// Read the current state without changing it
    pub async fn snapshot(&self) -> BatchJob {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> BatchStatus {
        self.state.read().await.status
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(url: &str) -> ItemResult {
        ItemResult::Success {
            url: url.to_string(),
            video_id: "abc123".to_string(),
            language: "en".to_string(),
            transcript: "[00:00] hello".to_string(),
            summary: None,
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.status().await, BatchStatus::Idle);

        tracker.reset(2).await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.status, BatchStatus::Processing);
        assert!(snapshot.results.is_empty());

        tracker.set_current("https://youtu.be/a").await;
        tracker.append(success("https://youtu.be/a")).await;
        tracker.set_current("not a url").await;
        tracker.append(ItemResult::failure("not a url", &TranscriptorError::InvalidUrl)).await;
        assert_eq!(tracker.snapshot().await.current_video.as_deref(), Some("not a url"));

        tracker.mark_completed().await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.status, BatchStatus::Completed);
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.current_video, None);
        assert!(snapshot.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_results_never_exceed_total() {
        let tracker = ProgressTracker::new();
        tracker.reset(1).await;
        tracker.append(success("a")).await;
        tracker.append(success("b")).await;
        assert_eq!(tracker.snapshot().await.results.len(), 1);
    }

    #[tokio::test]
    async fn test_writes_outside_processing_are_ignored() {
        let tracker = ProgressTracker::new();
        tracker.append(success("a")).await;
        tracker.set_current("a").await;
        let snapshot = tracker.snapshot().await;
        assert!(snapshot.results.is_empty());
        assert_eq!(snapshot.current_video, None);
    }

    #[tokio::test]
    async fn test_reset_clears_previous_batch() {
        let tracker = ProgressTracker::new();
        tracker.reset(1).await;
        tracker.append(success("a")).await;
        tracker.mark_completed().await;

        tracker.reset(3).await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.status, BatchStatus::Processing);
        assert!(snapshot.results.is_empty());
        assert_eq!(snapshot.total, 3);
    }

    #[tokio::test]
    async fn test_attach_summary_only_touches_successes() {
        let tracker = ProgressTracker::new();
        tracker.reset(2).await;
        tracker.append(success("a")).await;
        tracker.append(ItemResult::failure("b", &TranscriptorError::InvalidUrl)).await;

        tracker
            .attach_summary(0, Summary::Generated { text: "short".to_string(), model: "m".to_string() })
            .await;
        tracker
            .attach_summary(1, Summary::Generated { text: "nope".to_string(), model: "m".to_string() })
            .await;

        let results = tracker.snapshot().await.results;
        assert_eq!(serde_json::to_value(&results[0]).unwrap()["summary"], "short");
        assert_eq!(
            serde_json::to_value(&results[1]).unwrap(),
            json!({"url": "b", "error": "Invalid URL"})
        );
    }

    #[test]
    fn test_serialized_shapes() {
        let mut item = success("https://www.youtube.com/watch?v=abc123");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "url": "https://www.youtube.com/watch?v=abc123",
                "video_id": "abc123",
                "language": "en",
                "transcript": "[00:00] hello"
            })
        );

        if let ItemResult::Success { summary, .. } = &mut item {
            *summary = Some(Summary::Failed(TranscriptorError::GenerationExhausted { attempts: 4 }));
        }
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value["summary"],
            "Error: AI model did not respond. Please choose a different model and try again."
        );

        let job = BatchJob::idle(Uuid::nil());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "idle");
        assert_eq!(value["current_video"], serde_json::Value::Null);
        assert_eq!(value["results"], json!([]));
    }
}
