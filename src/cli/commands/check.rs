//! Check command: transcript plus fact check.

use super::transcript::{ensure_ok, fetch_transcript, print_summary, run_preflight};
use crate::cli::{Output, PipelineArgs};
use crate::config::Settings;
use crate::fact_check::{Claim, FactChecker, OpenAIFactChecker};
use crate::openai::OPENAI_API_KEY_ENV;
use crate::orchestrator::{Orchestrator, PipelineResult};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct CheckReport<'a> {
    #[serde(flatten)]
    result: &'a PipelineResult,
    claims: &'a [Claim],
}

/// Run the check command.
pub async fn run_check(args: &PipelineArgs, settings: Settings) -> Result<()> {
    run_preflight(args, &settings)?;

    let orchestrator = Orchestrator::new(&settings)?.require_credentials([OPENAI_API_KEY_ENV]);
    let result = fetch_transcript(&orchestrator, args).await;
    ensure_ok(&result)?;

    if !args.json {
        print_summary(&result);
    }

    let checker = OpenAIFactChecker::from_settings(&settings.fact_check)?;
    let lang_hint = result.language.as_deref().unwrap_or("auto");

    let spinner = (!args.json).then(|| Output::spinner("Checking facts..."));
    let claims = checker.fact_check(&result.text, lang_hint).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let claims = match claims {
        Ok(claims) => claims,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    if args.json {
        let report = CheckReport {
            result: &result,
            claims: &claims,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        Output::header(&format!("Fact check ({} claims)", claims.len()));
        Output::claims_table(&claims);
    }

    Ok(())
}
