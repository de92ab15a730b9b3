//! Fact extraction and verdicts for a transcript.
//!
//! The pipeline only produces text; callers hand that text to a
//! [`FactChecker`] to get a list of checkable claims with verdicts.

mod openai;

pub use openai::OpenAIFactChecker;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum number of source URLs per claim.
pub const MAX_SOURCES: usize = 3;

/// Assessment of a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unclear,
}

impl Verdict {
    /// Lenient parse; anything unknown is `Unclear`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "correct" | "true" | "richtig" => Verdict::Correct,
            "incorrect" | "false" | "falsch" => Verdict::Incorrect,
            _ => Verdict::Unclear,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Correct => write!(f, "correct"),
            Verdict::Incorrect => write!(f, "incorrect"),
            Verdict::Unclear => write!(f, "unclear"),
        }
    }
}

/// An objectively checkable statement from the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim: String,
    pub verdict: Verdict,
    /// Up to [`MAX_SOURCES`] http(s) URLs.
    pub sources: Vec<String>,
}

impl Claim {
    pub fn new(claim: impl Into<String>, verdict: Verdict, sources: Vec<String>) -> Self {
        let sources = sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| is_http_url(s))
            .take(MAX_SOURCES)
            .collect();

        Self {
            claim: claim.into(),
            verdict,
            sources,
        }
    }
}

fn is_http_url(s: &str) -> bool {
    (s.starts_with("http://") || s.starts_with("https://")) && !s.contains(char::is_whitespace)
}

/// LLM collaborator that extracts and judges claims.
#[async_trait]
pub trait FactChecker: Send + Sync {
    async fn fact_check(&self, text: &str, lang_hint: &str) -> Result<Vec<Claim>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse_lenient("Correct"), Verdict::Correct);
        assert_eq!(Verdict::parse_lenient("falsch"), Verdict::Incorrect);
        assert_eq!(Verdict::parse_lenient("maybe"), Verdict::Unclear);
    }

    #[test]
    fn test_claim_sources_filtered_and_capped() {
        let claim = Claim::new(
            "Die Erde ist rund.",
            Verdict::Correct,
            vec![
                "https://a.example".into(),
                "not a url".into(),
                "ftp://b.example".into(),
                "http://c.example".into(),
                "https://d.example".into(),
                "https://e.example".into(),
            ],
        );
        assert_eq!(
            claim.sources,
            vec!["https://a.example", "http://c.example", "https://d.example"]
        );
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        let json = serde_json::to_string(&Verdict::Incorrect).unwrap();
        assert_eq!(json, "\"incorrect\"");
    }
}
