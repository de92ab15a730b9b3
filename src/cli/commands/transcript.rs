//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, PipelineArgs};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, PipelineResult, TranscriptSource};
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(args: &PipelineArgs, settings: Settings) -> Result<()> {
    run_preflight(args, &settings)?;

    let orchestrator = Orchestrator::new(&settings)?;
    let result = fetch_transcript(&orchestrator, args).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return ensure_ok(&result);
    }

    ensure_ok(&result)?;
    print_summary(&result);
    println!("\n{}", result.text);

    Ok(())
}

pub(crate) fn run_preflight(args: &PipelineArgs, settings: &Settings) -> Result<()> {
    let operation = if args.skip_captions || settings.audio_fallback.enabled {
        Operation::AudioFallback
    } else {
        Operation::Captions
    };

    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        Output::info("Run 'faktum doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Run the pipeline behind a spinner.
pub(crate) async fn fetch_transcript(orchestrator: &Orchestrator, args: &PipelineArgs) -> PipelineResult {
    let spinner = if args.json {
        None
    } else {
        Some(Output::spinner(&format!("Fetching transcript for {}...", args.url)))
    };

    let result = orchestrator.run_with(&args.url, args.run_options()).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    result
}

/// Print the status line and fail on anything but `Ok`.
pub(crate) fn ensure_ok(result: &PipelineResult) -> Result<()> {
    if result.is_ok() {
        return Ok(());
    }

    Output::error(result.message());
    if let Some(detail) = &result.detail {
        Output::kv("Detail", detail);
    }
    Err(anyhow::anyhow!("pipeline finished with status {}", result.status))
}

pub(crate) fn print_summary(result: &PipelineResult) {
    let source = match result.source {
        Some(TranscriptSource::Cache) => "cache",
        Some(TranscriptSource::Captions) => "captions",
        Some(TranscriptSource::Audio) => "audio transcription",
        None => "unknown",
    };

    Output::success(result.message());
    Output::kv("Source", source);
    Output::kv("Language", result.language.as_deref().unwrap_or("unknown"));
    Output::kv("Characters", &result.text.chars().count().to_string());
}
