use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "video-digest",
    about = "Video Digest - Batch YouTube transcripts with optional AI summaries",
    version,
    long_about = "Reads a CSV file with a 'url' column, retrieves the caption transcript of every YouTube video in it, and optionally condenses each transcript into a short summary with a hosted language model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve transcripts for every URL in a CSV file
    Transcripts {
        /// CSV file with a 'url' column
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Retrieve transcripts and summarize each one
    Process {
        /// CSV file with a 'url' column
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Model key (deepseek, gpt, mistral, gemini, gemma); defaults to the configured model
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to bind (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configure settings
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List model keys available for summaries
    Models,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON, same shape as the HTTP API
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
