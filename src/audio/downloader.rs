//! Audio download and conversion utilities.
//!
//! This module downloads the best available audio stream with yt-dlp and
//! converts it with ffmpeg into the mono 16 kHz WAV the transcription
//! service expects.

use crate::error::{FaktumError, Result};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Downloads the best audio stream of a video, skipping the video stream.
///
/// If a previous download for this id exists in `output_dir`, it is returned
/// without downloading again.
#[instrument(skip(output_dir, timeout), fields(video_id = %video_id))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let prefix = format!("{}.source.", video_id);
    if let Some(existing) = find_audio_file(output_dir, &prefix) {
        info!("Using cached audio file");
        return Ok(existing);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}%(ext)s", prefix));

    let mut command = Command::new("yt-dlp");
    command
        .arg("--format").arg("bestaudio/best")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = run_tool(command, "yt-dlp", timeout)
        .await
        .map_err(|e| match e {
            FaktumError::ToolFailed(msg) => FaktumError::AudioDownload(msg),
            other => other,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FaktumError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
    }

    find_audio_file(output_dir, &prefix)
        .ok_or_else(|| FaktumError::AudioDownload("Audio file not found after download".into()))
}

/// Converts any audio file to 16-bit PCM, mono, 16 kHz WAV at `dest`.
///
/// Returns immediately if `dest` already exists.
#[instrument(skip(timeout))]
pub async fn convert_to_wav(source: &Path, dest: &Path, timeout: Duration) -> Result<()> {
    if dest.exists() {
        info!("Using cached WAV file");
        return Ok(());
    }

    debug!("Converting {:?} to mono 16 kHz WAV", source);

    // Partial output keeps another name until ffmpeg succeeds.
    let partial = dest.with_extension("partial.wav");

    let mut command = Command::new("ffmpeg");
    command
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-ac").arg("1")
        .arg("-ar").arg("16000")
        .arg("-c:a").arg("pcm_s16le")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&partial)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = run_tool(command, "ffmpeg", timeout)
        .await
        .map_err(|e| match e {
            FaktumError::ToolFailed(msg) => FaktumError::AudioConversion(msg),
            other => other,
        })?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&partial);
        let err = String::from_utf8_lossy(&output.stderr);
        return Err(FaktumError::AudioConversion(format!(
            "ffmpeg conversion failed: {}",
            err.trim()
        )));
    }

    std::fs::rename(&partial, dest)?;
    Ok(())
}

/// Run an external tool with a timeout.
async fn run_tool(mut command: Command, name: &str, timeout: Duration) -> Result<Output> {
    match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => Err(FaktumError::Timeout(timeout.as_secs())),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FaktumError::ToolNotFound(name.to_string()))
        }
        Ok(Err(e)) => Err(FaktumError::ToolFailed(format!("{name} execution failed: {e}"))),
        Ok(Ok(output)) => Ok(output),
    }
}

/// Locates a downloaded file whose name starts with `prefix`.
fn find_audio_file(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .flatten()
        .map(|e| e.path())
        .find(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            // yt-dlp keeps in-progress downloads as *.part
            name.starts_with(prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_audio_file_ignores_partial_downloads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.source.webm.part"), b"x").unwrap();
        assert!(find_audio_file(dir.path(), "abc123.source.").is_none());

        std::fs::write(dir.path().join("abc123.source.webm"), b"x").unwrap();
        assert_eq!(
            find_audio_file(dir.path(), "abc123.source."),
            Some(dir.path().join("abc123.source.webm"))
        );
    }

    #[tokio::test]
    async fn test_download_skipped_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("abc123.source.m4a");
        std::fs::write(&existing, b"audio").unwrap();

        // The URL is never contacted because the file already exists
        let path = download_audio("https://invalid.example", "abc123", dir.path(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(path, existing);
    }

    #[tokio::test]
    async fn test_convert_skipped_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abc123.wav");
        std::fs::write(&dest, b"RIFF").unwrap();

        convert_to_wav(&dir.path().join("missing.m4a"), &dest, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFF");
    }
}
