//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::history::HistoryStore;
use console::style;
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
    Output::header("Spor Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let mut section = |title: &str, results: Vec<CheckResult>| {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    };

    // Only videos need yt-dlp.
    section("External Tools", vec![check_ytdlp()]);
    section("Model Endpoint", vec![check_endpoint(settings)]);
    section("Chat History", vec![check_history(settings)]);
    section("Configuration", vec![check_config_file()]);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Spor.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Spor is ready to use.");
    }

    Ok(())
}

fn check_ytdlp() -> CheckResult {
    match Command::new("yt-dlp").arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok("yt-dlp", &version)
        }
        Ok(_) => {
            CheckResult::warning("yt-dlp", "installed but not working", install_hint_ytdlp())
        }
        Err(_) => {
            CheckResult::warning("yt-dlp", "not found (needed for videos)", install_hint_ytdlp())
        }
    }
}

fn check_endpoint(settings: &Settings) -> CheckResult {
    let llm = &settings.llm;
    match preflight::check_endpoint(llm) {
        Ok(()) => {
            let key = match llm.resolved_api_key() {
                Some(key) => format!("key {}", mask_key(&key)),
                None => "no key".to_string(),
            };
            CheckResult::ok(
                "Endpoint",
                &format!(
                    "{} (model {}, embeddings {}, {})",
                    llm.api_base, llm.model, settings.embedding.model, key
                ),
            )
        }
        Err(e) => CheckResult::error(
            "Endpoint",
            &e.to_string(),
            "Set llm.api_base (and llm.api_key or OPENAI_API_KEY) in the config file",
        ),
    }
}

fn check_history(settings: &Settings) -> CheckResult {
    let db_path = settings.sqlite_path();
    if !db_path.exists() {
        return CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on the first question",
        );
    }

    match HistoryStore::open(&db_path).and_then(|store| store.count()) {
        Ok(count) => {
            let size = std::fs::metadata(&db_path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            CheckResult::ok(
                "Database",
                &format!("{} ({}, {} exchange(s))", db_path.display(), size, count),
            )
        }
        Err(e) => CheckResult::error(
            "Database",
            &format!("{} ({})", db_path.display(), e),
            "Move the file aside to start a fresh history",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: spor config init")
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
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
