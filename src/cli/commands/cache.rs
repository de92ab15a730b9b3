//! Cache maintenance command.

use crate::cache::{FailureCache, TranscriptCache};
use crate::cli::output::preview;
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the cache command.
pub fn run_cache(action: &CacheAction, settings: &Settings) -> Result<()> {
    let cache_dir = settings.cache_dir();
    let transcripts = TranscriptCache::new(&cache_dir);
    let failures = FailureCache::new(&cache_dir);

    match action {
        CacheAction::List => {
            let records = transcripts.list();
            Output::header(&format!("Cached transcripts ({})", records.len()));
            for record in &records {
                Output::list_item(&format!(
                    "{} [{}] {} ({})",
                    record.video_id,
                    record.language.as_deref().unwrap_or("?"),
                    preview(&record.text, 60),
                    record.fetched_at.format("%Y-%m-%d %H:%M")
                ));
            }

            let active = failures.list_active();
            Output::header(&format!("Recent failures ({})", active.len()));
            for record in &active {
                Output::list_item(&format!(
                    "{} {} until {}",
                    record.video_id,
                    record.status,
                    record.expires_at.format("%Y-%m-%d %H:%M")
                ));
            }
        }

        CacheAction::Clear { video_id: Some(id) } => {
            transcripts.remove(id)?;
            failures.clear(id)?;
            Output::success(&format!("Removed cache entries for {}", id));
        }

        CacheAction::Clear { video_id: None } => {
            let removed = transcripts.clear()?;
            let failed = failures.clear_all()?;
            Output::success(&format!(
                "Removed {} transcripts and {} failure records",
                removed, failed
            ));
        }
    }

    Ok(())
}
