use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cli::OutputFormat;
use crate::progress::{BatchStatus, ItemResult, ProgressTracker};

pub mod formatters;

pub use formatters::*;

/// How often the progress bar polls the tracker
const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn render(results: &[ItemResult], format: &OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(results),
        OutputFormat::Json => format_as_json(results)?,
        OutputFormat::Csv => format_as_csv(results)?,
    })
}

/// Save batch results to file
pub async fn save_to_file(results: &[ItemResult], path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(results, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print batch results to console
pub fn print_to_console(results: &[ItemResult], format: &OutputFormat) -> Result<()> {
    println!("{}", render(results, format)?);
    Ok(())
}

/// One-line tally printed after a batch
pub fn print_summary_line(results: &[ItemResult], elapsed: &str) {
    let succeeded = results.iter().filter(|item| item.is_success()).count();
    let failed = results.len() - succeeded;
    eprintln!(
        "{} {} succeeded, {} failed in {}",
        style("Done:").green().bold(),
        succeeded,
        style(failed).red(),
        elapsed
    );
}

/// Poll a tracker and mirror it on a progress bar until the batch completes
pub async fn watch_progress(tracker: ProgressTracker) {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    loop {
        let snapshot = tracker.snapshot().await;
        progress.set_length(snapshot.total as u64);
        progress.set_position(snapshot.results.len() as u64);
        if let Some(current) = &snapshot.current_video {
            progress.set_message(current.clone());
        }

        if snapshot.status == BatchStatus::Completed {
            progress.finish_and_clear();
            break;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait for a progress watcher; a watcher that died is logged, not fatal
pub async fn join_watcher(watcher: JoinHandle<()>) -> bool {
    match watcher.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Progress display stopped early: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TranscriptorError;

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let results = vec![ItemResult::failure("bad", &TranscriptorError::InvalidUrl)];

        save_to_file(&results, &path, &OutputFormat::Json).await.unwrap();

        let saved: serde_json::Value = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["results"][0]["url"], "bad");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_progress_stops_on_completion() {
        let tracker = ProgressTracker::new();
        tracker.reset(1).await;
        let watcher = tokio::spawn(watch_progress(tracker.clone()));

        tracker.append(ItemResult::failure("bad", &TranscriptorError::InvalidUrl)).await;
        tracker.mark_completed().await;

        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_join_watcher_survives_a_crashed_watcher() {
        let crashed = tokio::spawn(async { panic!("terminal went away") });
        assert!(!join_watcher(crashed).await);

        let finished = tokio::spawn(async {});
        assert!(join_watcher(finished).await);
    }
}
