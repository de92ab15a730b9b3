//! Positive transcript cache.

use super::{entry_path, json_entries, remove_if_exists, write_atomic};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// A fetched transcript as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub video_id: String,
    pub text: String,
    /// Normalized language code, if known.
    #[serde(rename = "lang")]
    pub language: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Video id → transcript store without expiry.
pub struct TranscriptCache {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl TranscriptCache {
    /// Create a cache rooted at `<cache_dir>/transcripts`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join("transcripts"),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a transcript. Unreadable entries and records stored for
    /// another id count as a miss.
    pub fn get(&self, video_id: &str) -> Option<TranscriptRecord> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let record = read_record(&entry_path(&self.dir, video_id))?;
        if record.video_id != video_id {
            warn!(video_id, stored = %record.video_id, "Cached transcript belongs to another id");
            return None;
        }
        Some(record)
    }

    /// Store a transcript, replacing any previous record for the id.
    pub fn set(&self, video_id: &str, text: &str, language: Option<&str>) -> Result<TranscriptRecord> {
        let record = TranscriptRecord {
            video_id: video_id.to_string(),
            text: text.to_string(),
            language: language.map(str::to_string),
            fetched_at: Utc::now(),
        };

        let bytes = serde_json::to_vec_pretty(&record)?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        write_atomic(&entry_path(&self.dir, video_id), &bytes)?;
        debug!(video_id, chars = text.len(), "Cached transcript");
        Ok(record)
    }

    pub fn remove(&self, video_id: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        remove_if_exists(&entry_path(&self.dir, video_id))
    }

    /// Every readable record, ordered by file name.
    pub fn list(&self) -> Vec<TranscriptRecord> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        json_entries(&self.dir)
            .iter()
            .filter_map(|p| read_record(p))
            .collect()
    }

    /// Remove all records. Returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let entries = json_entries(&self.dir);
        for path in &entries {
            remove_if_exists(path)?;
        }
        Ok(entries.len())
    }
}

fn read_record(path: &Path) -> Option<TranscriptRecord> {
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read cached transcript {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_slice(&content) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring corrupt cached transcript {}: {}", path.display(), e);
            None
        }
    }
}
