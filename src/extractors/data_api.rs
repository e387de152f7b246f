use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::Result;

const CAPTIONS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/captions";

/// Pre-flight query: does a video have any captions at all?
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionCheck: Send + Sync {
    /// Report caption presence. Failures of the lookup itself count as "no captions".
    async fn has_captions(&self, video_id: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// YouTube Data API v3 caption lookup
pub struct YoutubeDataApi {
    client: Client,
    api_key: String,
}

impl YoutubeDataApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn list_captions(&self, video_id: &str) -> Result<CaptionListResponse> {
        let response = self
            .client
            .get(CAPTIONS_ENDPOINT)
            .query(&[
                ("part", "id,snippet"),
                ("videoId", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("captions.list failed: HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CaptionCheck for YoutubeDataApi {
    async fn has_captions(&self, video_id: &str) -> bool {
        match self.list_captions(video_id).await {
            Ok(list) => !list.items.is_empty(),
            Err(e) => {
                tracing::warn!("[YouTube API] Caption check failed for {}: {:#}", video_id, e);
                false
            }
        }
    }
}
