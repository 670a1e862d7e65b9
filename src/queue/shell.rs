// src/queue/shell.rs

//! Run a queue command line through `sh -c` and capture its output.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured result of one queue command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {code}")
        } else {
            format!("exit status {code}: {stderr}")
        }
    }
}

pub async fn run_command(command_line: &str) -> Result<CommandOutput> {
    debug!(cmd = %command_line, "running queue command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning queue command '{command_line}'"))?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Quote a word for `sh` unless it is made of characters that need none.
pub fn shell_quote(word: &str) -> String {
    let plain = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ',' | '=' | ':'));
    if plain && !word.is_empty() {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
