//! Video Digest - batch transcript retrieval and summarization for YouTube videos
//!
//! This library reads a list of video URLs, pulls each video's caption transcript,
//! optionally condenses it with a hosted text-generation model, and keeps a progress
//! record that pollers can read while the batch runs.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod summarize;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::BatchPipeline;
pub use progress::{BatchJob, BatchStatus, ItemResult, ProgressTracker, Summary};
pub use summarize::Summarizer;
pub use transcribe::{Transcript, TranscriptRetriever};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the batch pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptorError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("No suitable transcript found")]
    NoTranscriptAvailable,

    #[error("Error: {0}")]
    TransientRetrieval(String),

    #[error("Rate limited by model {0}")]
    RateLimited(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Error: AI model did not respond. Please choose a different model and try again.")]
    GenerationExhausted { attempts: u32 },

    #[error("Could not read URL list: {0}")]
    SourceLoad(String),
}
