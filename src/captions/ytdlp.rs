//! Captions via yt-dlp subtitle download.

use super::{parse_vtt, CaptionTrack, CaptionsError, CaptionsService};
use crate::video::VideoRef;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Fetches manual or auto-generated subtitles with yt-dlp.
///
/// All preferred languages go out in a single invocation.
pub struct YtDlpCaptions {
    timeout: Duration,
}

impl YtDlpCaptions {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CaptionsService for YtDlpCaptions {
    #[instrument(skip(self), fields(video_id = %video.video_id))]
    async fn fetch_captions(
        &self,
        video: &VideoRef,
        languages: &[String],
    ) -> Result<Vec<CaptionTrack>, CaptionsError> {
        let temp_dir =
            tempfile::tempdir().map_err(|e| CaptionsError::Service(format!("tempdir: {e}")))?;
        let template = temp_dir.path().join("%(id)s.%(ext)s");

        let mut command = Command::new("yt-dlp");
        command
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(sub_langs_arg(languages))
            .arg("--sub-format").arg("vtt")
            .arg("--output").arg(&template)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(&video.canonical_url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(CaptionsError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptionsError::ToolNotFound("yt-dlp".into()));
            }
            Ok(Err(e)) => return Err(CaptionsError::Service(format!("yt-dlp execution failed: {e}"))),
            Ok(Ok(o)) => o,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_ytdlp_error(&stderr));
        }

        let tracks = read_tracks(temp_dir.path(), &video.video_id)?;
        debug!("yt-dlp produced {} caption track(s)", tracks.len());

        if tracks.is_empty() {
            return Err(CaptionsError::NoTranscriptFound {
                requested: languages.to_vec(),
            });
        }

        Ok(tracks)
    }
}

/// `de,de-.*,en,en-.*` so regional variants are downloaded too.
fn sub_langs_arg(languages: &[String]) -> String {
    languages
        .iter()
        .flat_map(|l| [l.clone(), format!("{}-.*", l)])
        .collect::<Vec<_>>()
        .join(",")
}

/// Load `<id>.<lang>.vtt` files written by yt-dlp.
fn read_tracks(dir: &Path, video_id: &str) -> Result<Vec<CaptionTrack>, CaptionsError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CaptionsError::Service(format!("Cannot read subtitle directory: {e}")))?;

    let mut tracks = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("vtt") {
            continue;
        }

        let Some(language) = subtitle_language(&path, video_id) else {
            continue;
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| CaptionsError::Service(format!("Cannot read subtitle file: {e}")))?;
        tracks.push(CaptionTrack::new(language, parse_vtt(&content)));
    }

    tracks.sort_by(|a, b| a.language.cmp(&b.language));
    Ok(tracks)
}

fn subtitle_language(path: &Path, video_id: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let language = stem.strip_prefix(video_id)?.strip_prefix('.')?;
    (!language.is_empty()).then(|| language.to_string())
}

/// Turn yt-dlp's stderr into a captions error.
fn parse_ytdlp_error(stderr: &str) -> CaptionsError {
    let lower = stderr.to_lowercase();
    let message = stderr
        .lines()
        .find(|l| l.starts_with("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .to_string();

    if lower.contains("not a bot") || lower.contains("sign in to confirm") || lower.contains("unusual traffic") {
        CaptionsError::Blocked(message)
    } else if lower.contains("http error 429") || lower.contains("too many requests") {
        CaptionsError::TooManyRequests(message)
    } else if lower.contains("subtitles are disabled") || lower.contains("transcripts disabled") {
        CaptionsError::TranscriptsDisabled
    } else if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("has been removed")
    {
        CaptionsError::VideoUnavailable(message)
    } else {
        CaptionsError::Service(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_langs_arg() {
        let langs = vec!["de".to_string(), "en".to_string()];
        assert_eq!(sub_langs_arg(&langs), "de,de-.*,en,en-.*");
    }

    #[test]
    fn test_parse_ytdlp_error() {
        assert!(matches!(
            parse_ytdlp_error("ERROR: [youtube] abc: Sign in to confirm you're not a bot."),
            CaptionsError::Blocked(_)
        ));
        assert!(matches!(
            parse_ytdlp_error("ERROR: Unable to download: HTTP Error 429: Too Many Requests"),
            CaptionsError::TooManyRequests(_)
        ));
        assert!(matches!(
            parse_ytdlp_error("ERROR: [youtube] abc: Video unavailable"),
            CaptionsError::VideoUnavailable(_)
        ));
        assert_eq!(
            parse_ytdlp_error("WARNING: retrying\nERROR: connection reset by peer"),
            CaptionsError::Service("ERROR: connection reset by peer".to_string())
        );
    }

    #[test]
    fn test_read_tracks_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("abc123.de.vtt"),
            "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHallo Welt\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("abc123.en-US.vtt"), "WEBVTT\n\n").unwrap();
        std::fs::write(dir.path().join("other.txt"), "ignored").unwrap();

        let tracks = read_tracks(dir.path(), "abc123").unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language, "de");
        assert_eq!(tracks[0].text(), "Hallo Welt");
        assert_eq!(tracks[1].language, "en-US");
        assert!(tracks[1].segments.is_empty());
    }
}
