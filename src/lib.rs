//! Faktum - fact-check YouTube videos
//!
//! Turns a video URL into transcript text and hands it to an LLM that picks
//! out checkable claims.
//!
//! # Overview
//!
//! The transcript pipeline:
//! - validates the URL and extracts the video ID
//! - serves cached transcripts and remembers recent failures
//! - fetches captions through a self-throttling, retrying client
//! - optionally transcribes the audio track when a video has no captions
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `video` - URL validation and video IDs
//! - `cache` - Transcript and failure caches
//! - `captions` - Captions service, rate limiter and retry state machine
//! - `audio` - Audio download and conversion
//! - `transcription` - Speech-to-text
//! - `fact_check` - Claim extraction and verdicts
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use faktum::config::Settings;
//! use faktum::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let result = orchestrator.run("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await;
//!     println!("{}: {}", result.status, result.message());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cache;
pub mod captions;
pub mod cli;
pub mod config;
pub mod error;
pub mod fact_check;
pub mod openai;
pub mod orchestrator;
pub mod transcription;
pub mod video;

pub use error::{FaktumError, Result};
