use url::Url;

pub mod data_api;
pub mod youtube;

/// Hosts that serve the canonical watch page
const WATCH_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com"];

/// Short-link host where the whole path is the identifier
const SHORT_LINK_HOST: &str = "youtu.be";

/// Check whether a host belongs to YouTube
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == SHORT_LINK_HOST || WATCH_HOSTS.contains(&host.as_str())
}

/// Extract the video identifier from a YouTube URL.
///
/// Recognized shapes:
/// - `https://www.youtube.com/watch?v=<id>`
/// - `https://www.youtube.com/embed/<id>` (also `/shorts/<id>` and `/live/<id>`)
/// - `https://youtu.be/<id>`
///
/// Anything else yields `None`; callers record it as an invalid URL.
pub fn extract_video_id(input: &str) -> Option<String> {
    let parsed = Url::parse(input.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    if !is_youtube_host(&host) {
        return None;
    }

    let id = if host == SHORT_LINK_HOST {
        parsed.path_segments()?.next().map(str::to_string)
    } else if parsed.path() == "/watch" {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else {
        let mut segments = parsed.path_segments()?;
        match segments.next() {
            Some("embed" | "shorts" | "live") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())
}

/// Build the canonical watch URL for a video identifier
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("  https://m.youtube.com/watch?v=abc123  "),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_embed_and_short_links() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=tracking"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/shortid"),
            Some("shortid".to_string())
        );
    }

    #[test]
    fn test_malformed_urls() {
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/"), None);
        assert_eq!(extract_video_id("https://youtu.be/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/channel/xyz"), None);
        assert_eq!(extract_video_id("https://vimeo.com/watch?v=abc123"), None);
        assert_eq!(extract_video_id("ftp://youtu.be/abc123"), None);
    }

    #[test]
    fn test_is_youtube_host() {
        assert!(is_youtube_host("www.youtube.com"));
        assert!(is_youtube_host("YOUTU.BE"));
        assert!(!is_youtube_host("youtube.com.evil.net"));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }
}
