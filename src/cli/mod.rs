//! CLI module for Faktum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::orchestrator::RunOptions;
use clap::{Args, Parser, Subcommand};

/// Faktum - fact-check YouTube videos
///
/// Fetches a video's captions (or transcribes its audio) and asks an LLM
/// which statements in it hold up.
#[derive(Parser, Debug)]
#[command(name = "faktum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FAKTUM_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level from the `-v` count, or `configured` when no flag is given.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Flags shared by commands that run the pipeline.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// YouTube URL (watch, shorts, live or youtu.be)
    pub url: String,

    /// Ignore cached transcripts and recent failures
    #[arg(short, long)]
    pub force: bool,

    /// Transcribe the audio track instead of using captions
    #[arg(long)]
    pub skip_captions: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

impl PipelineArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            force: self.force,
            skip_captions: self.skip_captions,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a video's transcript and fact-check it
    Check(PipelineArgs),

    /// Fetch a video's transcript only
    Transcript(PipelineArgs),

    /// Inspect or clear cached transcripts and failures
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached transcripts and active failure records
    List,

    /// Remove cache entries
    Clear {
        /// Only remove entries for this video ID
        video_id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
