use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Environment variable holding the YouTube Data API key
pub const YOUTUBE_API_KEY_VAR: &str = "YOUTUBE_API_KEY";

/// Environment variable holding the OpenRouter API key
pub const OPENROUTER_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transcript retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Summarization settings
    #[serde(default)]
    pub summarization: SummarizationConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// API credentials, read from the environment only
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Attempts per video before recording a failure
    pub max_attempts: u32,

    /// Linear backoff step between attempts
    pub backoff_step_secs: u64,

    /// Minimum gap between two videos
    pub pacing_secs: u64,

    /// Ask the YouTube Data API whether captions exist before listing tracks
    pub precheck_captions: bool,

    /// yt-dlp executable
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Model key used when a request does not name one
    pub default_model: String,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff step after a rate-limit answer
    pub rate_limit_step_secs: u64,

    /// Delay after any other failed attempt
    pub retry_delay_secs: u64,

    /// Chat-completions endpoint
    pub endpoint: String,

    /// Sent as `HTTP-Referer`
    pub referer: String,

    /// Sent as `X-Title`
    pub app_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub youtube_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step_secs: 2,
            pacing_secs: 2,
            precheck_captions: false,
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            default_model: "mistral".to_string(),
            max_retries: 3,
            rate_limit_step_secs: 5,
            retry_delay_secs: 2,
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            referer: "http://localhost:5173".to_string(),
            app_title: "VideoSummarizer".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        Self {
            youtube_api_key: var(YOUTUBE_API_KEY_VAR),
            openrouter_api_key: var(OPENROUTER_API_KEY_VAR),
        }
    }

    /// Names of the credentials that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.youtube_api_key.is_none() {
            missing.push(YOUTUBE_API_KEY_VAR);
        }
        if self.openrouter_api_key.is_none() {
            missing.push(OPENROUTER_API_KEY_VAR);
        }
        missing
    }
}

impl Config {
    /// Load configuration from file or create default, then pick up credentials
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;
            Self::from_yaml(&content)?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.credentials = Credentials::from_env();
        config.warn_missing_credentials();
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("video-digest").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.retrieval.max_attempts == 0 {
            anyhow::bail!("retrieval.max_attempts must be at least 1");
        }

        let endpoint = Url::parse(&self.summarization.endpoint)
            .context("summarization.endpoint is not a valid URL")?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!("summarization.endpoint must use HTTP or HTTPS protocol");
        }

        Ok(())
    }

    /// Credentials are optional; calls that need them fail per item instead
    pub fn warn_missing_credentials(&self) {
        for name in self.credentials.missing() {
            tracing::warn!("{} is not set; calls that need it will fail", name);
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        fn state(value: &Option<String>) -> &'static str {
            if value.is_some() { "set" } else { "not set" }
        }

        println!("Current Configuration:");
        println!("  Config File: {}", Self::config_path().map(|p| p.display().to_string()).unwrap_or_default());
        println!("  Retrieval Attempts: {}", self.retrieval.max_attempts);
        println!("  Retrieval Backoff Step: {}s", self.retrieval.backoff_step_secs);
        println!("  Pacing: {}s", self.retrieval.pacing_secs);
        println!("  Caption Pre-check: {}", self.retrieval.precheck_captions);
        println!("  yt-dlp: {}", self.retrieval.yt_dlp_path);
        println!("  Default Model: {}", self.summarization.default_model);
        println!("  Summary Retries: {}", self.summarization.max_retries);
        println!("  Endpoint: {}", self.summarization.endpoint);
        println!("  Server: {}:{}", self.server.host, self.server.port);
        println!("  {}: {}", YOUTUBE_API_KEY_VAR, state(&self.credentials.youtube_api_key));
        println!("  {}: {}", OPENROUTER_API_KEY_VAR, state(&self.credentials.openrouter_api_key));
    }
}
