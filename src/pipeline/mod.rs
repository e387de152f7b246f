use std::io::Read;
use std::sync::Arc;

use crate::config::Config;
use crate::extractors::data_api::YoutubeDataApi;
use crate::extractors::extract_video_id;
use crate::extractors::youtube::YoutubeExtractor;
use crate::progress::{ItemResult, ProgressTracker, Summary};
use crate::summarize::{OpenRouterClient, Summarizer, SummaryPolicy};
use crate::transcribe::{RetrievalPolicy, TranscriptRetriever};
use crate::TranscriptorError;

/// Column that holds the video URLs
pub const URL_COLUMN: &str = "url";

/// Read the URL list from CSV input.
///
/// Rows with an empty URL are dropped. A missing `url` column, unreadable
/// input or a list with no URLs is fatal for the whole batch.
pub fn load_urls<R: Read>(reader: R) -> std::result::Result<Vec<String>, TranscriptorError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| TranscriptorError::SourceLoad(e.to_string()))?;
    let column = headers
        .iter()
        .position(|header| header == URL_COLUMN)
        .ok_or_else(|| TranscriptorError::SourceLoad(format!("missing '{}' column", URL_COLUMN)))?;

    let mut urls = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| TranscriptorError::SourceLoad(e.to_string()))?;
        if let Some(url) = record.get(column).filter(|url| !url.is_empty()) {
            urls.push(url.to_string());
        }
    }

    if urls.is_empty() {
        return Err(TranscriptorError::SourceLoad("no URLs found".to_string()));
    }

    Ok(urls)
}

/// Drives a batch: transcripts for every URL, then optional summaries
pub struct BatchPipeline {
    retriever: TranscriptRetriever,
    summarizer: Summarizer,
}

impl BatchPipeline {
    pub fn new(retriever: TranscriptRetriever, summarizer: Summarizer) -> Self {
        Self { retriever, summarizer }
    }

    /// Wire the YouTube and OpenRouter clients from configuration
    pub fn from_config(config: &Config) -> Self {
        let source = Arc::new(YoutubeExtractor::new(config.retrieval.yt_dlp_path.clone()));
        let mut retriever = TranscriptRetriever::new(source, RetrievalPolicy::from(&config.retrieval));

        if config.retrieval.precheck_captions {
            match &config.credentials.youtube_api_key {
                Some(key) => retriever = retriever.with_caption_check(Arc::new(YoutubeDataApi::new(key.clone()))),
                None => tracing::warn!("Caption pre-check enabled but no YouTube API key is set; skipping it"),
            }
        }

        let backend = Arc::new(OpenRouterClient::new(
            &config.summarization,
            config.credentials.openrouter_api_key.clone().unwrap_or_default(),
        ));
        let summarizer = Summarizer::new(backend, SummaryPolicy::from(&config.summarization));

        Self::new(retriever, summarizer)
    }

    /// Transcripts-only batch
    pub async fn run_transcripts(&self, urls: &[String], tracker: &ProgressTracker) -> Vec<ItemResult> {
        tracker.reset(urls.len()).await;
        let results = self.collect_transcripts(urls, tracker).await;
        tracker.mark_completed().await;
        results
    }

    /// Transcripts, then a summary for every successful item.
    /// The batch stays `processing` until the last summary is attached.
    pub async fn run_with_summaries(
        &self,
        urls: &[String],
        model_key: &str,
        tracker: &ProgressTracker,
    ) -> Vec<ItemResult> {
        tracker.reset(urls.len()).await;
        let mut results = self.collect_transcripts(urls, tracker).await;

        let pending = results.iter().filter(|item| item.is_success()).count();
        tracing::info!("Summarizing {} transcripts with model '{}'", pending, model_key);

        for (index, item) in results.iter_mut().enumerate() {
            let ItemResult::Success { url, transcript, summary, .. } = item else {
                continue;
            };

            tracker.set_current(url).await;
            let outcome = Summary::from(self.summarizer.summarize(transcript, model_key).await);
            if let Summary::Failed(error) = &outcome {
                tracing::warn!("Summary failed for {}: {}", url, error);
            }

            tracker.attach_summary(index, outcome.clone()).await;
            *summary = Some(outcome);
        }

        tracker.mark_completed().await;
        results
    }

    async fn collect_transcripts(&self, urls: &[String], tracker: &ProgressTracker) -> Vec<ItemResult> {
        let mut results = Vec::with_capacity(urls.len());

        for (idx, url) in urls.iter().enumerate() {
            tracker.set_current(url).await;

            let result = match extract_video_id(url) {
                None => {
                    tracing::warn!("[{}/{}] Invalid URL: {}", idx + 1, urls.len(), url);
                    ItemResult::failure(url.as_str(), &TranscriptorError::InvalidUrl)
                }
                Some(video_id) => {
                    tracing::info!("[{}/{}] Processing: {}", idx + 1, urls.len(), video_id);
                    match self.retriever.retrieve(&video_id).await {
                        Ok(transcript) => ItemResult::Success {
                            url: url.clone(),
                            video_id: transcript.video_id,
                            language: transcript.language,
                            transcript: transcript.text,
                            summary: None,
                        },
                        Err(error) => ItemResult::failure(url.as_str(), &error),
                    }
                }
            };

            tracker.append(result.clone()).await;
            results.push(result);
        }

        results
    }
}
