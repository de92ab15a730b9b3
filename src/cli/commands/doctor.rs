//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::openai::OPENAI_API_KEY_ENV;
use crate::transcription::DEEPGRAM_API_KEY_ENV;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Faktum Doctor");
    println!();

    let fallback = settings.audio_fallback.enabled;
    let sections = [
        (
            "External Tools",
            vec![
                check_tool("yt-dlp", "--version", true, install_hint_ytdlp()),
                check_tool("ffmpeg", "-version", fallback, install_hint_ffmpeg()),
            ],
        ),
        (
            "API Configuration",
            vec![
                check_api_key(
                    OPENAI_API_KEY_ENV,
                    std::env::var(OPENAI_API_KEY_ENV).ok(),
                    true,
                    "Set with: export OPENAI_API_KEY='sk-...'",
                ),
                check_api_key(
                    DEEPGRAM_API_KEY_ENV,
                    std::env::var(DEEPGRAM_API_KEY_ENV).ok(),
                    fallback,
                    "Set with: export DEEPGRAM_API_KEY='...'",
                ),
            ],
        ),
        (
            "Directories",
            vec![
                check_directory("Cache directory", &settings.cache_dir()),
                check_directory("Work directory", &settings.work_dir()),
            ],
        ),
        ("Configuration", vec![check_config_file(&Settings::default_config_path())]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Faktum.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Faktum is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_arg: &str, required: bool, hint: &str) -> CheckResult {
    let failure = |message: &str| {
        if required {
            CheckResult::error(name, message, hint)
        } else {
            CheckResult::warning(name, &format!("{} (only needed for audio fallback)", message), hint)
        }
    };

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect::<String>();
            CheckResult::ok(name, &version)
        }
        Ok(_) => failure("installed but not working"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => failure("not found"),
        Err(e) => failure(&format!("error: {}", e)),
    }
}

/// Check an API key taken from the environment.
fn check_api_key(name: &str, value: Option<String>, required: bool, hint: &str) -> CheckResult {
    match value.as_deref().map(str::trim) {
        Some(key) if key.len() > 12 => {
            let masked: String = key.chars().take(4).collect();
            CheckResult::ok(name, &format!("configured ({}...)", masked))
        }
        Some(key) if !key.is_empty() => {
            CheckResult::warning(name, "set but looks too short", hint)
        }
        _ if required => CheckResult::error(name, "not set", hint),
        _ => CheckResult::ok(name, "not set (audio fallback disabled)"),
    }
}

fn check_directory(name: &str, path: &Path) -> CheckResult {
    if path.is_dir() {
        CheckResult::ok(name, &path.display().to_string())
    } else if path.exists() {
        CheckResult::error(name, &format!("{} is not a directory", path.display()), "Point it elsewhere in the config file")
    } else {
        CheckResult::warning(
            name,
            &format!("{} (will be created)", path.display()),
            "Directory will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: faktum config init",
        );
    }

    match Settings::load_from(Some(&config_path.to_path_buf())) {
        Ok(_) => CheckResult::ok("Config file", &config_path.display().to_string()),
        Err(e) => CheckResult::error("Config file", &e.to_string(), "Fix or regenerate with: faktum config init --force"),
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
