//! Pipeline orchestrator for Faktum.
//!
//! Turns a video URL into transcript text: cache lookup, captions with
//! retries, optional audio fallback, and write-through caching. One job runs
//! per process at a time; concurrent callers get [`PipelineStatus::Locked`].

use crate::audio::{AudioPipeline, FfmpegAudioPipeline};
use crate::cache::{FailureCache, TranscriptCache};
use crate::captions::{CaptionFetcher, CaptionsService, FetchFailure, RateLimiter, RetryPolicy, YtDlpCaptions};
use crate::config::Settings;
use crate::error::{FaktumError, Result};
use crate::transcription::{DeepgramTranscriber, Transcriber, DEEPGRAM_API_KEY_ENV};
use crate::video::VideoRef;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    InvalidUrl,
    MissingCredentials,
    NoCaptions,
    RateLimited,
    TransientError,
    Locked,
}

impl PipelineStatus {
    /// Short human-readable status line.
    pub fn message(&self) -> &'static str {
        match self {
            PipelineStatus::Ok => "Transcript loaded.",
            PipelineStatus::InvalidUrl => "Not a valid YouTube URL.",
            PipelineStatus::MissingCredentials => "Required API credentials are not configured.",
            PipelineStatus::NoCaptions => "This video has no captions in a supported language.",
            PipelineStatus::RateLimited => {
                "YouTube is currently limiting requests. Please try again in a few minutes."
            }
            PipelineStatus::TransientError => "Fetching the transcript failed. Please try again later.",
            PipelineStatus::Locked => "Another video is being processed. Please try again shortly.",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStatus::Ok => "ok",
            PipelineStatus::InvalidUrl => "invalid_url",
            PipelineStatus::MissingCredentials => "missing_credentials",
            PipelineStatus::NoCaptions => "no_captions",
            PipelineStatus::RateLimited => "rate_limited",
            PipelineStatus::TransientError => "transient_error",
            PipelineStatus::Locked => "locked",
        };
        write!(f, "{}", name)
    }
}

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Cache,
    Captions,
    Audio,
}

/// Per-call switches for [`Orchestrator::run_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ignore cached transcripts and failures.
    pub force: bool,
    /// Go straight to the audio fallback.
    pub skip_captions: bool,
}

/// Negative cache lifetimes per failure class.
#[derive(Debug, Clone, Copy)]
struct FailureTtls {
    transient: Duration,
    rate_limited: Duration,
    no_captions: Duration,
}

/// The main orchestrator for the Faktum pipeline.
pub struct Orchestrator {
    lock: Mutex<()>,
    transcripts: Arc<TranscriptCache>,
    failures: Arc<FailureCache>,
    captions: CaptionFetcher,
    audio: Arc<dyn AudioPipeline>,
    transcriber: Arc<dyn Transcriber>,
    audio_fallback: bool,
    ttls: FailureTtls,
    required_credentials: Vec<String>,
}

impl Orchestrator {
    /// Create an orchestrator with the production collaborators.
    pub fn new(settings: &Settings) -> Result<Self> {
        let captions: Arc<dyn CaptionsService> = Arc::new(YtDlpCaptions::new(settings.captions.timeout()));
        let limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit));
        let audio: Arc<dyn AudioPipeline> = Arc::new(FfmpegAudioPipeline::new(
            settings.work_dir(),
            Duration::from_secs(settings.audio_fallback.download_timeout_secs),
        ));
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(DeepgramTranscriber::from_settings(&settings.transcription)?);

        if settings.audio_fallback.enabled {
            info!("Audio fallback enabled");
        }

        Ok(Self::with_components(settings, captions, limiter, audio, transcriber))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        captions: Arc<dyn CaptionsService>,
        limiter: Arc<RateLimiter>,
        audio: Arc<dyn AudioPipeline>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let cache_dir = settings.cache_dir();

        Self {
            lock: Mutex::new(()),
            transcripts: Arc::new(TranscriptCache::new(&cache_dir)),
            failures: Arc::new(FailureCache::new(&cache_dir)),
            captions: CaptionFetcher::new(
                captions,
                limiter,
                settings.captions.languages.clone(),
                RetryPolicy::from_settings(&settings.captions),
            ),
            audio,
            transcriber,
            audio_fallback: settings.audio_fallback.enabled,
            ttls: FailureTtls {
                transient: Duration::from_secs(settings.cache.transient_failure_ttl_secs),
                rate_limited: Duration::from_secs(settings.cache.rate_limited_ttl_secs),
                no_captions: Duration::from_secs(settings.cache.no_captions_ttl_secs),
            },
            required_credentials: Vec::new(),
        }
    }

    /// Environment variables that must be set before any upstream call.
    pub fn require_credentials<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_credentials.extend(names.into_iter().map(Into::into));
        self
    }

    /// Positive transcript cache.
    pub fn transcript_cache(&self) -> Arc<TranscriptCache> {
        self.transcripts.clone()
    }

    /// Negative failure cache.
    pub fn failure_cache(&self) -> Arc<FailureCache> {
        self.failures.clone()
    }

    /// Run the pipeline with default options.
    pub async fn run(&self, url: &str) -> PipelineResult {
        self.run_with(url, RunOptions::default()).await
    }

    /// Run the pipeline for one URL.
    #[instrument(skip(self))]
    pub async fn run_with(&self, url: &str, options: RunOptions) -> PipelineResult {
        let Ok(_guard) = self.lock.try_lock() else {
            info!("Pipeline busy, rejecting request");
            return PipelineResult::failure(PipelineStatus::Locked, None);
        };

        let Some(video) = VideoRef::parse(url) else {
            return PipelineResult::failure(PipelineStatus::InvalidUrl, None);
        };
        debug!(video_id = %video.video_id, "Resolved video");

        if let Some(missing) = self.missing_credential() {
            return PipelineResult::failure(
                PipelineStatus::MissingCredentials,
                Some(format!("{} is not set", missing)),
            );
        }

        if options.force {
            info!("Force mode: bypassing caches");
        } else {
            if let Some(record) = self.transcripts.get(&video.video_id) {
                info!("Transcript cache hit");
                return PipelineResult::ok(record.text, record.language, TranscriptSource::Cache);
            }

            if let Some(record) = self.failures.get_recent_failure(&video.video_id) {
                // A captions-only miss says nothing about the audio track.
                if options.skip_captions && record.status == PipelineStatus::NoCaptions {
                    debug!("Ignoring cached no_captions for an audio-only run");
                } else {
                    info!(status = %record.status, expires_at = %record.expires_at, "Negative cache hit");
                    return PipelineResult::failure(record.status, record.detail);
                }
            }
        }

        if options.skip_captions {
            return self.run_audio_fallback(&video).await;
        }

        match self.captions.fetch(&video).await {
            Ok(track) => {
                let text = track.text();
                self.record_success(&video, text, Some(&track.language), TranscriptSource::Captions)
            }
            Err(FetchFailure::NoTranscript { detail }) if self.audio_fallback => {
                info!(%detail, "No captions, falling back to audio transcription");
                self.run_audio_fallback(&video).await
            }
            Err(FetchFailure::NoTranscript { detail }) => {
                self.record_failure(&video, PipelineStatus::NoCaptions, detail)
            }
            Err(FetchFailure::RateLimited { detail, attempts }) => {
                warn!(attempts, "Captions service kept blocking");
                self.record_failure(&video, PipelineStatus::RateLimited, detail)
            }
            Err(FetchFailure::Transient { detail, attempts }) => {
                warn!(attempts, "Captions service kept failing");
                self.record_failure(&video, PipelineStatus::TransientError, detail)
            }
        }
    }

    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    async fn run_audio_fallback(&self, video: &VideoRef) -> PipelineResult {
        if !self.transcriber.is_configured() {
            return PipelineResult::failure(
                PipelineStatus::MissingCredentials,
                Some(format!("{} is not set", DEEPGRAM_API_KEY_ENV)),
            );
        }

        match self.transcribe_audio(video).await {
            Ok(transcript) if transcript.text.trim().is_empty() => self.record_failure(
                video,
                PipelineStatus::NoCaptions,
                "No speech recognized in the audio track".to_string(),
            ),
            Ok(transcript) => {
                let result = self.record_success(
                    video,
                    transcript.text.trim().to_string(),
                    transcript.language.as_deref(),
                    TranscriptSource::Audio,
                );
                if let Err(e) = self.audio.cleanup(video).await {
                    warn!("Failed to remove audio files: {}", e);
                }
                result
            }
            Err(FaktumError::MissingCredentials(name)) => PipelineResult::failure(
                PipelineStatus::MissingCredentials,
                Some(format!("{} is not set", name)),
            ),
            Err(e) => self.record_failure(video, PipelineStatus::TransientError, e.to_string()),
        }
    }

    async fn transcribe_audio(&self, video: &VideoRef) -> Result<crate::transcription::SpeechTranscript> {
        let raw = self.audio.download_audio(video).await?;
        let wav = self.audio.convert_to_wav(&raw).await?;
        self.transcriber.transcribe(&wav).await
    }

    fn record_success(
        &self,
        video: &VideoRef,
        text: String,
        language: Option<&str>,
        source: TranscriptSource,
    ) -> PipelineResult {
        let language = language.map(normalize_language).filter(|l| !l.is_empty());

        if let Err(e) = self.transcripts.set(&video.video_id, &text, language.as_deref()) {
            warn!("Failed to cache transcript: {}", e);
        }
        if let Err(e) = self.failures.clear(&video.video_id) {
            warn!("Failed to clear failure record: {}", e);
        }

        info!(chars = text.len(), ?language, ?source, "Transcript ready");
        PipelineResult::ok(text, language, source)
    }

    fn record_failure(&self, video: &VideoRef, status: PipelineStatus, detail: String) -> PipelineResult {
        if let Some(ttl) = self.ttl_for(status) {
            if let Err(e) = self
                .failures
                .mark_failure(&video.video_id, status, status.message(), Some(&detail), ttl)
            {
                warn!("Failed to record failure: {}", e);
            }
        }

        PipelineResult::failure(status, Some(detail))
    }

    fn ttl_for(&self, status: PipelineStatus) -> Option<Duration> {
        match status {
            PipelineStatus::NoCaptions => Some(self.ttls.no_captions),
            PipelineStatus::RateLimited => Some(self.ttls.rate_limited),
            PipelineStatus::TransientError => Some(self.ttls.transient),
            _ => None,
        }
    }

    fn missing_credential(&self) -> Option<&str> {
        self.required_credentials
            .iter()
            .find(|name| std::env::var(name).map_or(true, |v| v.trim().is_empty()))
            .map(String::as_str)
    }
}

/// Lower-case and drop any regional suffix: `en-US` and `en_GB` become `en`.
pub fn normalize_language(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub text: String,
    pub language: Option<String>,
    /// Raw upstream error text, kept apart from the status message.
    pub detail: Option<String>,
    pub source: Option<TranscriptSource>,
}

impl PipelineResult {
    fn ok(text: String, language: Option<String>, source: TranscriptSource) -> Self {
        Self {
            status: PipelineStatus::Ok,
            text,
            language,
            detail: None,
            source: Some(source),
        }
    }

    fn failure(status: PipelineStatus, detail: Option<String>) -> Self {
        Self {
            status,
            text: String::new(),
            language: None,
            detail,
            source: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PipelineStatus::Ok
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}
