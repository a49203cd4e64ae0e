use overlay_config::DIAGNOSTIC_TEXT_LIMIT;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

/// Result of running `<tool> <version flag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    /// Exit status was zero.
    pub ok: bool,
    /// Combined stdout and stderr, trimmed and truncated, or an `ERR: ...` line.
    pub text: String,
}

impl VersionCheck {
    fn failed(text: String) -> Self {
        Self {
            ok: false,
            text: truncate_chars(&text, DIAGNOSTIC_TEXT_LIMIT),
        }
    }

    /// First line of the captured text.
    pub fn headline(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

pub async fn check_version(program: &Path, flag: &str, timeout: Duration) -> VersionCheck {
    let mut cmd = tokio::process::Command::new(program);
    cmd.arg(flag).stdin(Stdio::null()).kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(out)) => {
            let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&out.stderr));
            VersionCheck {
                ok: out.status.success(),
                text: truncate_chars(text.trim(), DIAGNOSTIC_TEXT_LIMIT),
            }
        }
        Ok(Err(e)) => VersionCheck::failed(format!("ERR: {e}")),
        Err(_) => VersionCheck::failed(format!("ERR: timed out after {timeout:?}")),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
