use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

use crate::config::RetrievalConfig;
use crate::extractors::data_api::CaptionCheck;
use crate::{Result, TranscriptorError};

pub mod entries;

pub use entries::{format_timestamp, render_lines, RawEntry, TranscriptEntry};

/// One caption stream offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTrack {
    /// Language code, e.g. `en` or `tr`
    pub language_code: String,

    /// Whether the track was produced by automatic speech recognition
    pub is_generated: bool,

    /// Where the track's entries can be downloaded from
    pub url: String,
}

/// Source of transcript tracks for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List the tracks available for a video
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>>;

    /// Download the entries of one track in chronological order
    async fn fetch_entries(&self, track: &TranscriptTrack) -> Result<Vec<RawEntry>>;
}

/// A retrieved and normalized transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    /// `[MM:SS] text` lines joined by newlines
    pub text: String,
}

/// Pick the preferred track: manual first, then the first generated one
pub fn select_track(tracks: &[TranscriptTrack]) -> Option<&TranscriptTrack> {
    tracks
        .iter()
        .find(|track| !track.is_generated)
        .or_else(|| tracks.iter().find(|track| track.is_generated))
}

/// Retry and pacing knobs for transcript retrieval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalPolicy {
    /// Total attempts per video
    pub max_attempts: u32,

    /// Backoff after failed attempt `k` is `backoff_step * k`
    pub backoff_step: Duration,

    /// Minimum gap between two consecutive retrievals
    pub pacing: Duration,
}

impl RetrievalPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
            pacing: Duration::from_secs(2),
        }
    }
}

impl From<&RetrievalConfig> for RetrievalPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_step: Duration::from_secs(config.backoff_step_secs),
            pacing: Duration::from_secs(config.pacing_secs),
        }
    }
}

/// Fetches transcripts with bounded retries and pacing between videos
pub struct TranscriptRetriever {
    source: Arc<dyn CaptionSource>,
    caption_check: Option<Arc<dyn CaptionCheck>>,
    policy: RetrievalPolicy,
    last_finished: Mutex<Option<Instant>>,
}

impl TranscriptRetriever {
    pub fn new(source: Arc<dyn CaptionSource>, policy: RetrievalPolicy) -> Self {
        Self {
            source,
            caption_check: None,
            policy,
            last_finished: Mutex::new(None),
        }
    }

    /// Ask the metadata service whether captions exist before listing tracks
    pub fn with_caption_check(mut self, check: Arc<dyn CaptionCheck>) -> Self {
        self.caption_check = Some(check);
        self
    }

    /// Retrieve a transcript, retrying transient failures.
    ///
    /// Never fails for any reason other than the ones recorded per item:
    /// `NoTranscriptAvailable` or `TransientRetrieval` with the last error.
    pub async fn retrieve(&self, video_id: &str) -> std::result::Result<Transcript, TranscriptorError> {
        self.wait_for_pacing().await;
        let outcome = self.retrieve_with_retries(video_id).await;
        *self.last_finished.lock().await = Some(Instant::now());
        outcome
    }

    async fn wait_for_pacing(&self) {
        let last = *self.last_finished.lock().await;
        if let Some(last) = last {
            sleep_until(last + self.policy.pacing).await;
        }
    }

    async fn retrieve_with_retries(&self, video_id: &str) -> std::result::Result<Transcript, TranscriptorError> {
        if let Some(check) = &self.caption_check {
            if !check.has_captions(video_id).await {
                tracing::info!("No captions reported for {}, skipping", video_id);
                return Err(TranscriptorError::NoTranscriptAvailable);
            }
        }

        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(video_id).await {
                Ok(Some(transcript)) => {
                    tracing::info!("Transcript OK: {} ({})", video_id, transcript.language);
                    return Ok(transcript);
                }
                Ok(None) => {
                    tracing::warn!("No suitable transcript track for {}", video_id);
                    return Err(TranscriptorError::NoTranscriptAvailable);
                }
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {:#}",
                        attempt,
                        self.policy.max_attempts,
                        video_id,
                        e
                    );
                    last_error = format!("{:#}", e);

                    if attempt < self.policy.max_attempts {
                        sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(TranscriptorError::TransientRetrieval(last_error))
    }

    /// One round trip: list tracks, pick one, fetch and normalize it
    async fn attempt(&self, video_id: &str) -> Result<Option<Transcript>> {
        let tracks = self.source.list_tracks(video_id).await?;
        let Some(track) = select_track(&tracks) else {
            return Ok(None);
        };

        tracing::debug!(
            "Using {} track '{}' for {}",
            if track.is_generated { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        let entries: Vec<TranscriptEntry> = self
            .source
            .fetch_entries(track)
            .await?
            .into_iter()
            .filter_map(TranscriptEntry::from_raw)
            .collect();

        Ok(Some(Transcript {
            video_id: video_id.to_string(),
            language: track.language_code.clone(),
            text: render_lines(&entries),
        }))
    }
}
