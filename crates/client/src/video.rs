//! YouTube URL recognition.

use url::Url;

/// Extracts the video id from a YouTube watch URL.
///
/// Returns `None` for anything that is not a `youtube.com/watch` URL with a
/// non-empty `v` query parameter.
pub fn youtube_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    if host != "youtube.com" && !host.ends_with(".youtube.com") {
        return None;
    }
    if url.path() != "/watch" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extracts_id_with_extra_query_params() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?t=42&v=abc123&list=PL1"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn accepts_bare_and_music_subdomains() {
        assert_eq!(
            youtube_video_id("https://youtube.com/watch?v=abc"),
            Some("abc".to_string())
        );
        assert_eq!(
            youtube_video_id("https://music.youtube.com/watch?v=abc"),
            Some("abc".to_string())
        );
    }

    #[test]
    fn rejects_non_watch_pages() {
        assert_eq!(youtube_video_id("https://www.youtube.com/feed/subscriptions"), None);
        assert_eq!(youtube_video_id("https://www.youtube.com/watch"), None);
    }

    #[test]
    fn rejects_non_youtube_hosts() {
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(youtube_video_id("https://notyoutube.com/watch?v=abc"), None);
    }

    #[test]
    fn rejects_unparseable_input() {
        assert_eq!(youtube_video_id("not a url"), None);
        assert_eq!(youtube_video_id(""), None);
    }
}
