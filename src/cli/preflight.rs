//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting a pipeline
//! run that would otherwise fail midway. Credentials are left to the
//! orchestrator so an invalid URL is still reported as such.

use crate::error::{FaktumError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Captions only need yt-dlp.
    Captions,
    /// The audio fallback also needs ffmpeg.
    AudioFallback,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    check_tool("yt-dlp")?;
    if let Operation::AudioFallback = operation {
        check_tool("ffmpeg")?;
    }
    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), yt-dlp uses --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(FaktumError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FaktumError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(FaktumError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported() {
        let err = check_tool("faktum-no-such-tool").unwrap_err();
        assert!(matches!(err, FaktumError::ToolNotFound(name) if name == "faktum-no-such-tool"));
    }
}
