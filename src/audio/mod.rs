//! Audio fallback pipeline.
//!
//! Used when a video has no captions: fetch the audio track and turn it into
//! a canonical waveform for the speech-to-text service. Failures here are not
//! retried.

mod downloader;

pub use downloader::{convert_to_wav, download_audio};

use crate::error::Result;
use crate::video::VideoRef;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Download + conversion steps of the audio fallback.
#[async_trait]
pub trait AudioPipeline: Send + Sync {
    /// Download the best available audio stream and return its path.
    async fn download_audio(&self, video: &VideoRef) -> Result<PathBuf>;

    /// Convert a downloaded file to mono 16 kHz WAV and return its path.
    async fn convert_to_wav(&self, raw: &Path) -> Result<PathBuf>;

    /// Remove intermediate files for a video once its transcript is cached.
    async fn cleanup(&self, _video: &VideoRef) -> Result<()> {
        Ok(())
    }
}

/// yt-dlp + ffmpeg implementation working inside one directory.
pub struct FfmpegAudioPipeline {
    work_dir: PathBuf,
    timeout: Duration,
}

impl FfmpegAudioPipeline {
    pub fn new(work_dir: PathBuf, timeout: Duration) -> Self {
        Self { work_dir, timeout }
    }
}

#[async_trait]
impl AudioPipeline for FfmpegAudioPipeline {
    async fn download_audio(&self, video: &VideoRef) -> Result<PathBuf> {
        download_audio(&video.canonical_url, &video.video_id, &self.work_dir, self.timeout).await
    }

    async fn convert_to_wav(&self, raw: &Path) -> Result<PathBuf> {
        // "<id>.source.webm" -> "<id>.wav"
        let file_name = raw
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = file_name.split('.').next().unwrap_or("audio");
        let dest = self.work_dir.join(format!("{}.wav", id));

        convert_to_wav(raw, &dest, self.timeout).await?;
        Ok(dest)
    }

    async fn cleanup(&self, video: &VideoRef) -> Result<()> {
        let Ok(entries) = std::fs::read_dir(&self.work_dir) else {
            return Ok(());
        };

        let prefix = format!("{}.", video.video_id);
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                debug!("Removing {}", entry.path().display());
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}
