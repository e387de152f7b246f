use anyhow::Result;
use serde::Serialize;

use crate::progress::{ItemResult, Summary};

/// CSV row layout for exported results
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    url: &'a str,
    video_id: &'a str,
    language: &'a str,
    transcript: &'a str,
    summary: String,
    summary_model: &'a str,
    error: &'a str,
}

impl<'a> From<&'a ItemResult> for ResultRow<'a> {
    fn from(item: &'a ItemResult) -> Self {
        match item {
            ItemResult::Success {
                url,
                video_id,
                language,
                transcript,
                summary,
            } => ResultRow {
                url,
                video_id,
                language,
                transcript,
                summary: summary.as_ref().map(|s| s.text()).unwrap_or_default(),
                summary_model: summary.as_ref().and_then(Summary::model).unwrap_or_default(),
                error: "",
            },
            ItemResult::Failure { url, error } => ResultRow {
                url,
                video_id: "",
                language: "",
                transcript: "",
                summary: String::new(),
                summary_model: "",
                error,
            },
        }
    }
}

#[derive(Serialize)]
struct BatchOutput<'a> {
    status: &'a str,
    results: &'a [ItemResult],
}

/// Format results as JSON, the same shape the HTTP API returns
pub fn format_as_json(results: &[ItemResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&BatchOutput {
        status: "completed",
        results,
    })?)
}

/// Format results as readable text blocks
pub fn format_as_text(results: &[ItemResult]) -> String {
    let mut output = String::new();

    for (idx, item) in results.iter().enumerate() {
        if idx > 0 {
            output.push_str("\n\n");
        }

        match item {
            ItemResult::Success {
                url,
                video_id,
                language,
                transcript,
                summary,
            } => {
                output.push_str(&format!("== {} ({}, {})\n", url, video_id, language));
                match summary.as_ref().map(|s| (s, s.model())) {
                    Some((summary, Some(model))) => {
                        output.push_str(&format!("Summary ({}):\n{}\n\n", model, summary.text()));
                    }
                    Some((summary, None)) => {
                        output.push_str(&format!("Summary:\n{}\n\n", summary.text()));
                    }
                    None => {}
                }
                output.push_str("Transcript:\n");
                output.push_str(transcript);
            }
            ItemResult::Failure { url, error } => {
                output.push_str(&format!("== {}\n{}", url, error));
            }
        }
    }

    output
}

/// Format results as CSV with one row per input URL
pub fn format_as_csv(results: &[ItemResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in results {
        writer.serialize(ResultRow::from(item))?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TranscriptorError;

    fn sample() -> Vec<ItemResult> {
        vec![
            ItemResult::Success {
                url: "https://youtu.be/abc123".to_string(),
                video_id: "abc123".to_string(),
                language: "en".to_string(),
                transcript: "[00:00] hello\n[00:05] world".to_string(),
                summary: Some(Summary::Generated {
                    text: "A greeting.".to_string(),
                    model: "google/gemma-3-27b-it:free".to_string(),
                }),
            },
            ItemResult::failure("not a url", &TranscriptorError::InvalidUrl),
        ]
    }

    #[test]
    fn test_format_as_text() {
        let text = format_as_text(&sample());
        assert!(text.starts_with("== https://youtu.be/abc123 (abc123, en)\nSummary (google/gemma-3-27b-it:free):\nA greeting.\n\nTranscript:\n[00:00] hello"));
        assert!(text.ends_with("== not a url\nInvalid URL"));
    }

    #[test]
    fn test_format_as_csv() {
        let csv = format_as_csv(&sample()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("url,video_id,language,transcript,summary,summary_model,error"));
        assert!(csv.contains("\"[00:00] hello\n[00:05] world\",A greeting.,google/gemma-3-27b-it:free,\n"));
        assert!(csv.trim_end().ends_with("not a url,,,,,,Invalid URL"));
    }

    #[test]
    fn test_format_as_json() {
        let json: serde_json::Value = serde_json::from_str(&format_as_json(&sample()).unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["results"][0]["summary"], "A greeting.");
        assert!(json["results"][0].get("summary_model").is_none());
        assert_eq!(json["results"][1]["error"], "Invalid URL");
    }
}
