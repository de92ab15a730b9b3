//! Deepgram pre-recorded transcription.

use super::{SpeechTranscript, Transcriber};
use crate::config::TranscriptionSettings;
use crate::error::{FaktumError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable holding the API key.
pub const DEEPGRAM_API_KEY_ENV: &str = "DEEPGRAM_API_KEY";

/// Sends WAV audio to the Deepgram listen endpoint.
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl DeepgramTranscriber {
    /// Create a transcriber reading the key from the environment.
    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        let api_key = std::env::var(DEEPGRAM_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_config(settings, api_key)
    }

    pub fn with_config(settings: &TranscriptionSettings, api_key: Option<String>) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    #[instrument(skip(self), fields(wav_path = %wav_path.display()))]
    async fn transcribe(&self, wav_path: &Path) -> Result<SpeechTranscript> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FaktumError::MissingCredentials(DEEPGRAM_API_KEY_ENV.to_string()))?;

        let audio = tokio::fs::read(wav_path).await?;
        debug!(bytes = audio.len(), endpoint = %self.endpoint, "Sending audio to Deepgram");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("model", self.model.as_str()),
                ("detect_language", "true"),
                ("punctuate", "true"),
                ("smart_format", "true"),
                ("paragraphs", "true"),
            ])
            .header("Authorization", format!("Token {}", api_key))
            .header("Content-Type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FaktumError::Timeout(self.timeout.as_secs())
                } else {
                    FaktumError::Transcription(format!("request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(FaktumError::Transcription(format!("status {}: {}", status, body)));
        }

        let body: ListenResponse = response
            .json()
            .await
            .map_err(|e| FaktumError::Transcription(format!("parse response: {}", e)))?;

        let transcript = normalize_response(body);
        info!(
            chars = transcript.text.len(),
            language = ?transcript.language,
            "Deepgram transcription completed"
        );
        Ok(transcript)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListenResults {
    channels: Vec<Channel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Channel {
    detected_language: Option<String>,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Alternative {
    transcript: Option<String>,
    paragraphs: Option<Paragraphs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paragraphs {
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paragraph {
    sentences: Vec<Sentence>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Sentence {
    text: String,
}

/// Top alternative's transcript, else its paragraph sentences joined.
fn normalize_response(response: ListenResponse) -> SpeechTranscript {
    let Some(channel) = response.results.channels.into_iter().next() else {
        return SpeechTranscript::default();
    };
    let language = channel.detected_language;

    let Some(alternative) = channel.alternatives.into_iter().next() else {
        return SpeechTranscript { text: String::new(), language };
    };

    let text = match alternative.transcript.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => t,
        _ => alternative
            .paragraphs
            .map(|p| {
                p.paragraphs
                    .iter()
                    .flat_map(|para| para.sentences.iter())
                    .map(|s| s.text.trim())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default(),
    };

    SpeechTranscript { text, language }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::path::PathBuf;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}/v1/listen", addr)
    }

    fn transcriber_for(endpoint: String) -> DeepgramTranscriber {
        let settings = TranscriptionSettings {
            endpoint,
            timeout_secs: 5,
            ..Default::default()
        };
        DeepgramTranscriber::with_config(&settings, Some("test-key".to_string())).unwrap()
    }

    fn wav_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("audio.wav");
        std::fs::write(&path, b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();
        path
    }

    async fn listen(
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Token test-key");
        let flags_set = ["detect_language", "punctuate", "smart_format", "paragraphs"]
            .iter()
            .all(|k| params.get(*k).map(String::as_str) == Some("true"));
        let model_set = params.get("model").map(String::as_str) == Some("nova-2");

        if !authorized || !flags_set || !model_set || body.is_empty() {
            return (StatusCode::BAD_REQUEST, Json(json!({"err_msg": "unexpected request"})));
        }

        (
            StatusCode::OK,
            Json(json!({"results": {"channels": [{"detected_language": "de",
                "alternatives": [{"transcript": " Hallo Welt "}]}]}})),
        )
    }

    fn parse(json: &str) -> SpeechTranscript {
        normalize_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_uses_top_alternative() {
        let transcript = parse(
            r#"{"metadata": {}, "results": {"channels": [{"detected_language": "de",
                "alternatives": [{"transcript": "Hallo Welt", "confidence": 0.98},
                                 {"transcript": "Hallo Feld"}]}]}}"#,
        );
        assert_eq!(transcript.text, "Hallo Welt");
        assert_eq!(transcript.language.as_deref(), Some("de"));
    }

    #[test]
    fn test_falls_back_to_paragraphs() {
        let transcript = parse(
            r#"{"results": {"channels": [{"alternatives": [{"paragraphs": {"paragraphs": [
                {"sentences": [{"text": "Hallo Welt."}, {"text": "Wie geht's?"}]},
                {"sentences": [{"text": "Gut."}]}]}}]}]}}"#,
        );
        assert_eq!(transcript.text, "Hallo Welt. Wie geht's? Gut.");
        assert_eq!(transcript.language, None);
    }

    #[test]
    fn test_no_speech_is_empty_not_error() {
        assert_eq!(parse(r#"{"results": {"channels": [{"alternatives": [{"transcript": ""}]}]}}"#).text, "");
        assert_eq!(parse(r#"{}"#), SpeechTranscript::default());
    }

    #[tokio::test]
    async fn test_missing_key_is_credentials_error() {
        let transcriber = DeepgramTranscriber::with_config(&TranscriptionSettings::default(), None).unwrap();
        assert!(!transcriber.is_configured());

        let err = transcriber.transcribe(Path::new("/nonexistent.wav")).await.unwrap_err();
        assert!(matches!(err, FaktumError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_posts_audio_with_query_flags() {
        let endpoint = serve(Router::new().route("/v1/listen", post(listen))).await;
        let dir = tempfile::tempdir().unwrap();

        let transcript = transcriber_for(endpoint)
            .transcribe(&wav_file(&dir))
            .await
            .unwrap();

        assert_eq!(transcript.text, "Hallo Welt");
        assert_eq!(transcript.language.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_error_status_carries_status_and_body() {
        let router = Router::new().route(
            "/v1/listen",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let endpoint = serve(router).await;
        let dir = tempfile::tempdir().unwrap();

        let err = transcriber_for(endpoint)
            .transcribe(&wav_file(&dir))
            .await
            .unwrap_err();

        let FaktumError::Transcription(msg) = err else {
            panic!("expected transcription error, got {:?}", err);
        };
        assert!(msg.contains("500"), "{}", msg);
        assert!(msg.contains("upstream exploded"), "{}", msg);
    }
}
