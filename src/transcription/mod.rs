//! Speech-to-text for the audio fallback.

mod deepgram;

pub use deepgram::{DeepgramTranscriber, DEEPGRAM_API_KEY_ENV};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recognized speech of one audio file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechTranscript {
    /// Plain text; empty when the audio contains no speech.
    pub text: String,
    /// Language detected by the service, if reported.
    pub language: Option<String>,
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a mono 16 kHz WAV file.
    async fn transcribe(&self, wav_path: &Path) -> Result<SpeechTranscript>;

    /// Whether the credentials this service needs are present.
    fn is_configured(&self) -> bool {
        true
    }
}
