//! File-backed caches for transcripts and recent failures.
//!
//! Both caches keep one JSON file per video id. Writes land in a temporary
//! file in the target directory and are renamed into place, so a reader sees
//! either a complete record or none at all.

mod failure;
mod transcript;

pub use failure::{FailureCache, FailureRecord};
pub use transcript::{TranscriptCache, TranscriptRecord};

use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Map a video id to a safe file name.
fn file_name_for(video_id: &str) -> String {
    let safe: String = video_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.json", safe)
}

fn entry_path(dir: &Path, video_id: &str) -> PathBuf {
    dir.join(file_name_for(video_id))
}

/// Replace `path` with `bytes` in one rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, treating "already gone" as success.
fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// JSON entries of a cache directory; a missing directory is empty.
fn json_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_sanitized() {
        assert_eq!(file_name_for("dQw4w9WgXcQ"), "dQw4w9WgXcQ.json");
        assert_eq!(file_name_for("../etc/passwd"), "___etc_passwd.json");
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(json_entries(&dir.path().join("nested")), vec![path]);
    }
}
