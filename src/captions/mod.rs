//! Caption retrieval.
//!
//! The captions service is behind the [`CaptionsService`] trait. Every upstream
//! failure is turned into an [`ErrorClass`] by [`classify`], which drives the
//! retry state machine in [`CaptionFetcher`].

mod fetcher;
mod rate_limit;
mod vtt;
mod ytdlp;

pub use fetcher::{CaptionFetcher, FetchAttempt, FetchFailure, RetryPolicy};
pub use rate_limit::{RateLimiter, SlotGuard};
pub use vtt::parse_vtt;
pub use ytdlp::YtDlpCaptions;

use crate::video::VideoRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timed caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start_seconds: f64,
    pub text: String,
}

/// All caption lines of one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported by the service (may carry a region suffix).
    pub language: String,
    pub segments: Vec<CaptionSegment>,
}

impl CaptionTrack {
    pub fn new(language: impl Into<String>, segments: Vec<CaptionSegment>) -> Self {
        Self {
            language: language.into(),
            segments,
        }
    }

    /// Convenience constructor for a single untimed line.
    pub fn from_text(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            language,
            vec![CaptionSegment {
                start_seconds: 0.0,
                text: text.into(),
            }],
        )
    }

    /// Segment texts joined with single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Failures reported by a captions service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionsError {
    #[error("Subtitles are disabled for this video")]
    TranscriptsDisabled,

    #[error("No transcript found for languages {requested:?}")]
    NoTranscriptFound { requested: Vec<String> },

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Automated access blocked: {0}")]
    Blocked(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Captions request timed out after {0} seconds")]
    Timeout(u64),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Captions service error: {0}")]
    Service(String),
}

/// How the fetcher reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Definitive; retrying cannot help.
    NoTranscript,
    /// Automated-traffic detection or IP block; long backoff.
    Blocked,
    /// Network or service fault; short backoff.
    Transient,
}

/// Map an upstream failure to its retry class.
pub fn classify(error: &CaptionsError) -> ErrorClass {
    match error {
        CaptionsError::TranscriptsDisabled
        | CaptionsError::NoTranscriptFound { .. }
        | CaptionsError::VideoUnavailable(_) => ErrorClass::NoTranscript,
        CaptionsError::Blocked(_) | CaptionsError::TooManyRequests(_) => ErrorClass::Blocked,
        CaptionsError::Timeout(_) | CaptionsError::ToolNotFound(_) | CaptionsError::Service(_) => {
            ErrorClass::Transient
        }
    }
}

/// Upstream captions provider.
#[async_trait]
pub trait CaptionsService: Send + Sync {
    /// Fetch caption tracks for the requested languages in one request.
    ///
    /// Returns whatever tracks exist among `languages`; an empty list means
    /// none of them is available.
    async fn fetch_captions(
        &self,
        video: &VideoRef,
        languages: &[String],
    ) -> std::result::Result<Vec<CaptionTrack>, CaptionsError>;
}

/// Whether a track's language satisfies a preferred language.
///
/// `en-US` and `en_GB` satisfy `en`; the comparison ignores case.
pub fn language_matches(track_language: &str, preferred: &str) -> bool {
    let track = track_language.to_ascii_lowercase();
    let preferred = preferred.to_ascii_lowercase();
    track == preferred
        || track
            .strip_prefix(&preferred)
            .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('_'))
}

/// Pick the first non-empty track in preference order.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &[String]) -> Option<&'a CaptionTrack> {
    preferred.iter().find_map(|lang| {
        tracks
            .iter()
            .find(|t| language_matches(&t.language, lang) && !t.text().is_empty())
    })
}
