//! YouTube URL validation and video id extraction.
//!
//! Pure functions, no network access. Accepted shapes:
//!
//! - `https://www.youtube.com/watch?v=<id>` (id longer than 5 characters)
//! - `https://www.youtube.com/shorts/<id>` and `/live/<id>` (id of at least 5 characters)
//! - `https://youtu.be/<id>` with exactly one path segment of at least 5 characters

use serde::{Deserialize, Serialize};
use url::Url;

const WATCH_ID_MIN_EXCLUSIVE: usize = 5;
const PATH_ID_MIN: usize = 5;

/// A validated reference to a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// Platform video id, used as the cache key.
    pub video_id: String,
    /// Canonical watch URL handed to downloaders.
    pub canonical_url: String,
}

impl VideoRef {
    /// Parse a URL into a video reference, or `None` if it is not a supported video URL.
    pub fn parse(input: &str) -> Option<Self> {
        extract_id(input).map(Self::from_id)
    }

    /// Build a reference from an already extracted id.
    pub fn from_id(video_id: String) -> Self {
        let canonical_url = format!("https://www.youtube.com/watch?v={}", video_id);
        Self {
            video_id,
            canonical_url,
        }
    }
}

/// Check whether the input is a supported YouTube video URL.
pub fn validate(input: &str) -> bool {
    extract_id(input).is_some()
}

/// Extract the video id from a supported URL.
pub fn extract_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let url = Url::parse(input).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path();

    if host.contains("youtube.com") {
        if path.starts_with("/watch") {
            return url
                .query_pairs()
                .find(|(k, v)| k == "v" && !v.is_empty())
                .map(|(_, v)| v.into_owned())
                .filter(|id| id.len() > WATCH_ID_MIN_EXCLUSIVE && is_id_charset(id));
        }

        if path.starts_with("/shorts/") || path.starts_with("/live/") {
            // "/shorts/<id>/..." splits into ["", "shorts", "<id>", ...]
            return path
                .split('/')
                .nth(2)
                .filter(|id| id.len() >= PATH_ID_MIN && is_id_charset(id))
                .map(str::to_string);
        }

        return None;
    }

    if host.contains("youtu.be") {
        let parts: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();
        if parts.len() == 1 && parts[0].len() >= PATH_ID_MIN && is_id_charset(parts[0]) {
            return Some(parts[0].to_string());
        }
    }

    None
}

/// Video ids only use `[A-Za-z0-9_-]`.
fn is_id_charset(id: &str) -> bool {
    id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
