use serde::Deserialize;

/// Caption entry as delivered by the captioning service.
///
/// Two layouts show up in practice: a plain record with a start offset in
/// seconds, and the timed-text event layout with a millisecond offset and the
/// text split into segments. Both are folded into [`TranscriptEntry`] as soon
/// as they are received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    /// `{"start": 5.4, "duration": 1.2, "text": "world"}`
    Seconds {
        start: f64,
        text: String,
    },
    /// `{"tStartMs": 5400, "segs": [{"utf8": "world"}]}`
    Event {
        #[serde(rename = "tStartMs")]
        start_ms: u64,
        #[serde(default)]
        segs: Vec<EventSegment>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventSegment {
    #[serde(default)]
    pub utf8: String,
}

/// One normalized caption line
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    /// Start offset in seconds (non-negative, fractional permitted)
    pub start_secs: f64,

    /// Caption text
    pub text: String,
}

impl TranscriptEntry {
    /// Normalize a raw entry.
    ///
    /// Plain records keep their text as delivered. Timed-text events are
    /// joined from their segments with line breaks folded into spaces, and
    /// events without visible text (window and styling events) are dropped.
    pub fn from_raw(raw: RawEntry) -> Option<Self> {
        let (start_secs, text) = match raw {
            RawEntry::Seconds { start, text } => (start, text),
            RawEntry::Event { start_ms, segs } => {
                let joined = segs.into_iter().map(|seg| seg.utf8).collect::<String>();
                let text = joined.split_whitespace().collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    return None;
                }
                (start_ms as f64 / 1000.0, text)
            }
        };

        Some(Self {
            start_secs: start_secs.max(0.0),
            text,
        })
    }

    /// Render as `[MM:SS] text`
    pub fn to_line(&self) -> String {
        format!("[{}] {}", format_timestamp(self.start_secs), self.text)
    }
}

/// Render a start offset as zero-padded `MM:SS`, truncating fractional seconds.
/// Minutes keep counting past 59.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Join entries into newline-separated timestamped lines, in source order
pub fn render_lines(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(TranscriptEntry::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(5.4), "00:05");
        assert_eq!(format_timestamp(125.7), "02:05");
        assert_eq!(format_timestamp(3725.0), "62:05");
    }

    #[test]
    fn test_both_shapes_deserialize() {
        let raw: Vec<RawEntry> = serde_json::from_str(
            r#"[
                {"start": 5.4, "duration": 1.0, "text": "world"},
                {"tStartMs": 125700, "dDurationMs": 900, "segs": [{"utf8": "split "}, {"utf8": "text"}]}
            ]"#,
        )
        .unwrap();

        let entries: Vec<_> = raw.into_iter().filter_map(TranscriptEntry::from_raw).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].to_line(), "[00:05] world");
        assert_eq!(entries[1].to_line(), "[02:05] split text");
    }

    #[test]
    fn test_blank_events_are_dropped() {
        let raw: RawEntry = serde_json::from_str(r#"{"tStartMs": 0, "segs": [{"utf8": "\n"}]}"#).unwrap();
        assert_eq!(TranscriptEntry::from_raw(raw), None);

        let raw: RawEntry = serde_json::from_str(r#"{"tStartMs": 0}"#).unwrap();
        assert_eq!(TranscriptEntry::from_raw(raw), None);
    }

    #[test]
    fn test_plain_records_keep_text() {
        let raw: RawEntry = serde_json::from_str(r#"{"start": 1.0, "text": "two  spaces\nand a break"}"#).unwrap();
        let entry = TranscriptEntry::from_raw(raw).unwrap();
        assert_eq!(entry.text, "two  spaces\nand a break");

        let raw: RawEntry = serde_json::from_str(r#"{"start": 2.0, "text": ""}"#).unwrap();
        assert_eq!(TranscriptEntry::from_raw(raw).unwrap().to_line(), "[00:02] ");
    }

    #[test]
    fn test_render_lines() {
        let entries = vec![
            TranscriptEntry { start_secs: 0.0, text: "hello".to_string() },
            TranscriptEntry { start_secs: 5.4, text: "world".to_string() },
        ];
        assert_eq!(render_lines(&entries), "[00:00] hello\n[00:05] world");
    }
}
