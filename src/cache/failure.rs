//! Negative cache of recent failures with lazy expiry.

use super::{entry_path, json_entries, remove_if_exists, write_atomic};
use crate::error::Result;
use crate::orchestrator::PipelineStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// A failed lookup remembered until `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub video_id: String,
    pub status: PipelineStatus,
    pub message: String,
    pub detail: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Video id → recent failure store.
pub struct FailureCache {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FailureCache {
    /// Create a cache rooted at `<cache_dir>/failures`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join("failures"),
            lock: Mutex::new(()),
        }
    }

    /// Remember a failure for `ttl`.
    pub fn mark_failure(
        &self,
        video_id: &str,
        status: PipelineStatus,
        message: &str,
        detail: Option<&str>,
        ttl: Duration,
    ) -> Result<FailureRecord> {
        self.mark_failure_at(video_id, status, message, detail, ttl, Utc::now())
    }

    pub fn mark_failure_at(
        &self,
        video_id: &str,
        status: PipelineStatus,
        message: &str,
        detail: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<FailureRecord> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let record = FailureRecord {
            video_id: video_id.to_string(),
            status,
            message: message.to_string(),
            detail: detail.map(str::to_string),
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let bytes = serde_json::to_vec_pretty(&record)?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        write_atomic(&entry_path(&self.dir, video_id), &bytes)?;
        debug!(video_id, status = ?status, expires_at = %record.expires_at, "Recorded failure");
        Ok(record)
    }

    /// The unexpired failure for `video_id`, if any.
    pub fn get_recent_failure(&self, video_id: &str) -> Option<FailureRecord> {
        self.get_recent_failure_at(video_id, Utc::now())
    }

    /// Lookup relative to `now`; an expired entry is deleted and reported absent.
    pub fn get_recent_failure_at(&self, video_id: &str, now: DateTime<Utc>) -> Option<FailureRecord> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = entry_path(&self.dir, video_id);
        let record = read_record(&path)?;
        if record.video_id != video_id {
            return None;
        }

        if record.expires_at <= now {
            debug!(video_id, "Failure record expired");
            if let Err(e) = remove_if_exists(&path) {
                warn!("Failed to evict expired failure record: {}", e);
            }
            return None;
        }

        Some(record)
    }

    /// Forget any failure recorded for `video_id`.
    pub fn clear(&self, video_id: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        remove_if_exists(&entry_path(&self.dir, video_id))
    }

    /// Unexpired records, ordered by file name.
    pub fn list_active(&self) -> Vec<FailureRecord> {
        let now = Utc::now();
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        json_entries(&self.dir)
            .iter()
            .filter_map(|p| read_record(p))
            .filter(|r| r.expires_at > now)
            .collect()
    }

    /// Remove all records. Returns how many were deleted.
    pub fn clear_all(&self) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let entries = json_entries(&self.dir);
        for path in &entries {
            remove_if_exists(path)?;
        }
        Ok(entries.len())
    }
}

fn read_record(path: &Path) -> Option<FailureRecord> {
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read failure record {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_slice(&content) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring corrupt failure record {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_visible_until_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FailureCache::new(dir.path());
        let now = Utc::now();

        cache
            .mark_failure_at(
                "vid123",
                PipelineStatus::TransientError,
                "Captions service unavailable",
                Some("connection reset"),
                Duration::from_secs(60),
                now,
            )
            .unwrap();

        let hit = cache
            .get_recent_failure_at("vid123", now + chrono::Duration::seconds(59))
            .unwrap();
        assert_eq!(hit.message, "Captions service unavailable");
        assert_eq!(hit.detail.as_deref(), Some("connection reset"));
        assert_eq!(hit.status, PipelineStatus::TransientError);

        assert!(cache
            .get_recent_failure_at("vid123", now + chrono::Duration::seconds(60))
            .is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FailureCache::new(dir.path());
        let now = Utc::now();

        cache
            .mark_failure_at("gone12", PipelineStatus::RateLimited, "blocked", None, Duration::from_secs(1), now)
            .unwrap();
        assert!(cache
            .get_recent_failure_at("gone12", now + chrono::Duration::seconds(5))
            .is_none());

        // The file is gone, so even an earlier clock no longer sees it
        assert!(cache.get_recent_failure_at("gone12", now).is_none());
    }

    #[test]
    fn test_clear_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FailureCache::new(dir.path());

        cache
            .mark_failure("vid123", PipelineStatus::NoCaptions, "none", None, Duration::from_secs(3600))
            .unwrap();
        assert!(cache.get_recent_failure("vid123").is_some());
        assert_eq!(cache.list_active().len(), 1);

        cache.clear("vid123").unwrap();
        assert!(cache.get_recent_failure("vid123").is_none());
        cache.clear("vid123").unwrap();
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FailureCache::new(dir.path());

        cache
            .mark_failure("vid123", PipelineStatus::TransientError, "x", None, Duration::ZERO)
            .unwrap();
        assert!(cache.get_recent_failure("vid123").is_none());
    }
}
