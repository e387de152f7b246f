use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;

use super::watch_url;
use crate::transcribe::{CaptionSource, RawEntry, TranscriptTrack};
use crate::Result;

/// Caption format requested from YouTube's timed-text endpoint
const CAPTION_FORMAT: &str = "json3";

/// Suffix yt-dlp puts on the auto track in the spoken language
const ORIGINAL_SUFFIX: &str = "-orig";

/// Subtitle keys that are not transcripts
const IGNORED_TRACKS: &[&str] = &["live_chat"];

/// YouTube caption source using yt-dlp for discovery
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    client: Client,
}

/// Subset of `yt-dlp --dump-json` output we care about
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionFormat {
    ext: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TimedTextDocument {
    #[serde(default)]
    events: Vec<Value>,
}

impl YoutubeExtractor {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            client: Client::new(),
        }
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let url = watch_url(video_id);
        tracing::debug!("Listing caption tracks for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", url.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("failed to run {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Flatten yt-dlp's caption maps into an ordered track list.
///
/// Manual tracks come first in key order. Generated tracks follow, with the
/// spoken-language track (`xx-orig`) ahead of machine translations.
fn collect_tracks(info: VideoInfo) -> Vec<TranscriptTrack> {
    fn pick(formats: &[CaptionFormat]) -> Option<&CaptionFormat> {
        formats.iter().find(|format| format.ext == CAPTION_FORMAT)
    }

    let mut tracks: Vec<TranscriptTrack> = info
        .subtitles
        .iter()
        .filter(|(language, _)| !IGNORED_TRACKS.contains(&language.as_str()))
        .filter_map(|(language, formats)| {
            pick(formats).map(|format| TranscriptTrack {
                language_code: language.clone(),
                is_generated: false,
                url: format.url.clone(),
            })
        })
        .collect();

    let (original, translated): (Vec<_>, Vec<_>) = info
        .automatic_captions
        .iter()
        .partition(|(language, _)| language.ends_with(ORIGINAL_SUFFIX));

    for (language, formats) in original.into_iter().chain(translated) {
        if let Some(format) = pick(formats) {
            tracks.push(TranscriptTrack {
                language_code: language.trim_end_matches(ORIGINAL_SUFFIX).to_string(),
                is_generated: true,
                url: format.url.clone(),
            });
        }
    }

    tracks
}

/// Parse a timed-text document, skipping events that fit neither entry layout
fn parse_timed_text(body: &str) -> Result<Vec<RawEntry>> {
    let document: TimedTextDocument = serde_json::from_str(body)?;
    Ok(document
        .events
        .into_iter()
        .filter_map(|event| serde_json::from_value(event).ok())
        .collect())
}

#[async_trait]
impl CaptionSource for YoutubeExtractor {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
        let info = self.get_video_info(video_id).await?;
        Ok(collect_tracks(info))
    }

    async fn fetch_entries(&self, track: &TranscriptTrack) -> Result<Vec<RawEntry>> {
        let response = self.client.get(&track.url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download captions: HTTP {}", response.status());
        }

        let body = response.text().await?;
        parse_timed_text(&body)
    }
}
