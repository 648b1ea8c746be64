//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::LlmSettings;
use crate::error::{Result, SporError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Loading a video requires yt-dlp for captions.
    LoadVideo,
    /// Asking questions requires a usable model endpoint.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, llm: &LlmSettings) -> Result<()> {
    match operation {
        Operation::LoadVideo => {
            check_endpoint(llm)?;
            check_tool("yt-dlp")?;
        }
        Operation::Ask => {
            check_endpoint(llm)?;
        }
    }
    Ok(())
}

/// Check the endpoint URL, and the API key when the endpoint is OpenAI itself.
pub fn check_endpoint(llm: &LlmSettings) -> Result<()> {
    let base = llm.api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(SporError::Config(format!(
            "llm.api_base must be an http(s) URL, got '{}'",
            llm.api_base
        )));
    }

    if base.contains("api.openai.com") && llm.resolved_api_key().is_none() {
        return Err(SporError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ));
    }

    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SporError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SporError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SporError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
