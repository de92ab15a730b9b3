//! Configuration settings for Faktum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub captions: CaptionSettings,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub audio_fallback: AudioFallbackSettings,
    pub transcription: TranscriptionSettings,
    pub fact_check: FactCheckSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding cached transcripts and failure records.
    pub cache_dir: String,
    /// Directory for downloaded and converted audio.
    pub work_dir: String,
    /// Log level when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            cache_dir: "~/.cache/faktum".to_string(),
            work_dir: "/tmp/faktum".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Captions service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
    /// Timeout for a single captions request.
    pub timeout_secs: u64,
    /// Maximum physical requests per job.
    pub max_attempts: u32,
    /// Base backoff after a blocked response.
    pub blocked_backoff_base_ms: u64,
    /// Upper bound for the blocked backoff.
    pub blocked_backoff_cap_ms: u64,
    /// Base backoff after a network or service error.
    pub transient_backoff_base_ms: u64,
    /// Upper bound for the transient backoff.
    pub transient_backoff_cap_ms: u64,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            languages: vec!["de".to_string(), "en".to_string()],
            timeout_secs: 120,
            max_attempts: 3,
            blocked_backoff_base_ms: 20_000,
            blocked_backoff_cap_ms: 120_000,
            transient_backoff_base_ms: 2_000,
            transient_backoff_cap_ms: 30_000,
        }
    }
}

/// Self-throttling toward the captions service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Minimum gap between two consecutive captions requests.
    pub min_interval_ms: u64,
    /// Jitter upper bound per attempt number.
    pub jitter_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 5_000,
            jitter_ms: 1_500,
        }
    }
}

/// Negative cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Network and service failures.
    pub transient_failure_ttl_secs: u64,
    /// Cooldown after the captions service blocked us.
    pub rate_limited_ttl_secs: u64,
    /// Videos that definitively have no transcript.
    pub no_captions_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            transient_failure_ttl_secs: 300,
            rate_limited_ttl_secs: 1_200,
            no_captions_ttl_secs: 86_400,
        }
    }
}

/// Audio download + speech-to-text fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFallbackSettings {
    /// Transcribe the audio track when a video has no captions.
    pub enabled: bool,
    /// Timeout for yt-dlp and ffmpeg invocations.
    pub download_timeout_secs: u64,
}

impl Default for AudioFallbackSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            download_timeout_secs: 600,
        }
    }
}

/// Speech-to-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Listen endpoint of the transcription service.
    pub endpoint: String,
    /// Model name passed to the service.
    pub model: String,
    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.deepgram.com/v1/listen".to_string(),
            model: "nova-2".to_string(),
            timeout_secs: 300,
        }
    }
}

/// LLM fact-check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactCheckSettings {
    /// Chat model used for claim extraction.
    pub model: String,
    /// Transcript characters sent to the model.
    pub max_chars: usize,
    /// Maximum tokens in the model response.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for FactCheckSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_chars: 12_000,
            max_tokens: 800,
            timeout_secs: 120,
        }
    }
}

impl CaptionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FaktumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("faktum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded cache directory path.
    pub fn cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.cache_dir)
    }

    /// Get the expanded audio work directory path.
    pub fn work_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.work_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [captions]
            languages = ["en"]

            [audio_fallback]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.captions.languages, vec!["en".to_string()]);
        assert_eq!(settings.captions.max_attempts, 3);
        assert!(settings.audio_fallback.enabled);
        assert_eq!(settings.cache.rate_limited_ttl_secs, 1_200);
        assert_eq!(settings.fact_check.model, "gpt-4o-mini");
        assert_eq!(settings.general.log_level, "warn");
    }

    #[test]
    fn test_log_level_from_toml() {
        let settings: Settings = toml::from_str("[general]\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(settings.general.log_level, "debug");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.rate_limit.min_interval_ms = 42;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.rate_limit.min_interval_ms, 42);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert!(!loaded.audio_fallback.enabled);
    }
}
