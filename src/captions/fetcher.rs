//! Caption fetch with classification-driven retries.

use super::{classify, select_track, CaptionTrack, CaptionsService, ErrorClass, RateLimiter};
use crate::config::CaptionSettings;
use crate::video::VideoRef;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Attempt cap and backoff curves.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub blocked_base: Duration,
    pub blocked_cap: Duration,
    pub transient_base: Duration,
    pub transient_cap: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &CaptionSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            blocked_base: Duration::from_millis(settings.blocked_backoff_base_ms),
            blocked_cap: Duration::from_millis(settings.blocked_backoff_cap_ms),
            transient_base: Duration::from_millis(settings.transient_backoff_base_ms),
            transient_cap: Duration::from_millis(settings.transient_backoff_cap_ms),
        }
    }

    /// Policy without any sleeping, for tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            blocked_base: Duration::ZERO,
            blocked_cap: Duration::ZERO,
            transient_base: Duration::ZERO,
            transient_cap: Duration::ZERO,
        }
    }

    /// `base × 2^(attempt-1) × U[1.0, 1.5)`, capped.
    pub fn backoff(&self, class: ErrorClass, attempt: u32) -> Duration {
        let (base, cap) = match class {
            ErrorClass::Blocked => (self.blocked_base, self.blocked_cap),
            ErrorClass::Transient => (self.transient_base, self.transient_cap),
            ErrorClass::NoTranscript => return Duration::ZERO,
        };

        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        let factor: f64 = rand::thread_rng().gen_range(1.0..1.5);
        base.saturating_mul(exp).min(cap).mul_f64(factor).min(cap)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Record of one physical request, kept only for logging.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub attempt: u32,
    pub languages_tried: Vec<String>,
    pub error_class: Option<ErrorClass>,
}

/// Terminal failure of a caption fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// The video has no transcript in the preferred languages.
    NoTranscript { detail: String },
    /// The service kept blocking us.
    RateLimited { detail: String, attempts: u32 },
    /// Network or service errors on every attempt.
    Transient { detail: String, attempts: u32 },
}

/// Fetches captions through the rate limiter with retries.
pub struct CaptionFetcher {
    service: Arc<dyn CaptionsService>,
    limiter: Arc<RateLimiter>,
    languages: Vec<String>,
    policy: RetryPolicy,
}

impl CaptionFetcher {
    pub fn new(
        service: Arc<dyn CaptionsService>,
        limiter: Arc<RateLimiter>,
        languages: Vec<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            limiter,
            languages,
            policy,
        }
    }

    /// Run the retry state machine until success or a terminal failure.
    #[instrument(skip(self), fields(video_id = %video.video_id))]
    pub async fn fetch(&self, video: &VideoRef) -> Result<CaptionTrack, FetchFailure> {
        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            let outcome = {
                let _slot = self.limiter.acquire_slot(attempt).await;
                self.service.fetch_captions(video, &self.languages).await
            };

            let (class, detail) = match outcome {
                Ok(tracks) => match select_track(&tracks, &self.languages) {
                    Some(track) => {
                        info!(attempt, language = %track.language, "Captions found");
                        return Ok(track.clone());
                    }
                    None => (
                        ErrorClass::NoTranscript,
                        format!("No captions in preferred languages {:?}", self.languages),
                    ),
                },
                Err(e) => (classify(&e), e.to_string()),
            };

            let record = FetchAttempt {
                attempt,
                languages_tried: self.languages.clone(),
                error_class: Some(class),
            };
            warn!(?record, %detail, "Captions attempt failed");

            match class {
                ErrorClass::NoTranscript => return Err(FetchFailure::NoTranscript { detail }),
                ErrorClass::Blocked if attempt >= max_attempts => {
                    return Err(FetchFailure::RateLimited { detail, attempts: attempt })
                }
                ErrorClass::Transient if attempt >= max_attempts => {
                    return Err(FetchFailure::Transient { detail, attempts: attempt })
                }
                ErrorClass::Blocked | ErrorClass::Transient => {
                    let delay = self.policy.backoff(class, attempt);
                    info!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::CaptionsError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses, repeating the last one.
    struct ScriptedService {
        responses: Mutex<Vec<std::result::Result<Vec<CaptionTrack>, CaptionsError>>>,
        calls: AtomicU32,
    }

    impl ScriptedService {
        fn new(responses: Vec<std::result::Result<Vec<CaptionTrack>, CaptionsError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptionsService for ScriptedService {
        async fn fetch_captions(
            &self,
            _video: &VideoRef,
            _languages: &[String],
        ) -> std::result::Result<Vec<CaptionTrack>, CaptionsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        }
    }

    fn fetcher(service: Arc<ScriptedService>, max_attempts: u32) -> CaptionFetcher {
        CaptionFetcher::new(
            service,
            Arc::new(RateLimiter::new(Duration::ZERO, Duration::ZERO)),
            vec!["de".to_string(), "en".to_string()],
            RetryPolicy::immediate(max_attempts),
        )
    }

    fn video() -> VideoRef {
        VideoRef::from_id("ABCDEFGHIJK".to_string())
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let service = ScriptedService::new(vec![Ok(vec![CaptionTrack::from_text("de", "Die Erde ist rund.")])]);
        let track = fetcher(service.clone(), 3).fetch(&video()).await.unwrap();

        assert_eq!(track.text(), "Die Erde ist rund.");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_transcript_is_not_retried() {
        let service = ScriptedService::new(vec![Err(CaptionsError::TranscriptsDisabled)]);
        let failure = fetcher(service.clone(), 3).fetch(&video()).await.unwrap_err();

        assert!(matches!(failure, FetchFailure::NoTranscript { .. }));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_tracks_are_no_transcript() {
        let service = ScriptedService::new(vec![Ok(vec![CaptionTrack::from_text("fr", "Bonjour")])]);
        let failure = fetcher(service.clone(), 3).fetch(&video()).await.unwrap_err();

        assert!(matches!(failure, FetchFailure::NoTranscript { .. }));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_blocked_exhausts_attempts() {
        let service = ScriptedService::new(vec![Err(CaptionsError::Blocked("not a bot".into()))]);
        let failure = fetcher(service.clone(), 3).fetch(&video()).await.unwrap_err();

        assert_eq!(
            failure,
            FetchFailure::RateLimited {
                detail: "Automated access blocked: not a bot".to_string(),
                attempts: 3
            }
        );
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let service = ScriptedService::new(vec![
            Err(CaptionsError::Service("connection reset".into())),
            Ok(vec![CaptionTrack::from_text("en-US", "Hello")]),
        ]);
        let track = fetcher(service.clone(), 3).fetch(&video()).await.unwrap();

        assert_eq!(track.language, "en-US");
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_transient_exhausts_attempts() {
        let service = ScriptedService::new(vec![Err(CaptionsError::Timeout(120))]);
        let failure = fetcher(service.clone(), 2).fetch(&video()).await.unwrap_err();

        assert!(matches!(failure, FetchFailure::Transient { attempts: 2, .. }));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let service = ScriptedService::new(vec![Err(CaptionsError::Timeout(1))]);
        let _ = fetcher(service.clone(), 0).fetch(&video()).await;
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 3,
            blocked_base: Duration::from_secs(20),
            blocked_cap: Duration::from_secs(120),
            transient_base: Duration::from_secs(2),
            transient_cap: Duration::from_secs(30),
        };

        let first = policy.backoff(ErrorClass::Blocked, 1);
        assert!(first >= Duration::from_secs(20) && first < Duration::from_secs(30));

        let second = policy.backoff(ErrorClass::Blocked, 2);
        assert!(second >= Duration::from_secs(40) && second < Duration::from_secs(60));

        assert_eq!(policy.backoff(ErrorClass::Blocked, 10), Duration::from_secs(120));
        assert!(policy.backoff(ErrorClass::Transient, 1) < Duration::from_secs(3));
        assert_eq!(policy.backoff(ErrorClass::NoTranscript, 1), Duration::ZERO);
    }
}
