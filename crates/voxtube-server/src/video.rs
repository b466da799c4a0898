//! YouTube URL and video-id extraction

use url::Url;

/// Whether `s` looks like a bare YouTube video id.
pub fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a video id from a YouTube URL, or accept a bare id.
///
/// Handles `watch?v=`, `youtu.be/`, `/shorts/`, `/embed/` and `/live/`
/// forms on the usual YouTube hosts.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if is_video_id(trimmed) {
        return Some(trimmed.to_string());
    }

    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?.strip_prefix("www.").unwrap_or(url.host_str()?);

    match host {
        "youtu.be" => url
            .path_segments()
            .and_then(|mut segments| segments.next().map(str::to_string))
            .filter(|id| is_video_id(id)),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            if let Some(id) = url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
            {
                return is_video_id(&id).then_some(id);
            }

            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("shorts" | "embed" | "live") => segments
                    .next()
                    .filter(|id| is_video_id(id))
                    .map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }
}
