//! Tool diagnostics: which external executables are installed and answer a
//! version query.
//!
//! Nothing here returns an error. Missing tools, timeouts, spawn failures and
//! nonzero exits all become `warn`/`fail` statuses or `[WARN]`/`[FAIL]` lines.

use overlay_config::{N8N_WEBHOOK_ENV, VERSION_CHECK_TIMEOUT};
use overlay_core::{Action, DiagnosticSnapshot, Tool, ToolState, ToolStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

mod tools;
mod version;

pub use version::{check_version, VersionCheck};

use crate::launcher::first_token;
use tools::ToolSpec;

/// Environment the probes resolve tools against.
#[derive(Debug, Clone, Default)]
pub struct ProbeEnv {
    vars: HashMap<String, String>,
    install_dirs: bool,
}

impl ProbeEnv {
    /// Snapshot of the current process environment, well-known install dirs enabled.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            vars,
            install_dirs: true,
        }
    }

    /// No variables (so no PATH) and no install dirs.
    pub fn isolated() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_install_dirs(mut self, enabled: bool) -> Self {
        self.install_dirs = enabled;
        self
    }

    /// A variable's value; blank values count as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn install_dirs_enabled(&self) -> bool {
        self.install_dirs
    }

    pub(crate) fn which(&self, binary: &str) -> Option<PathBuf> {
        let paths = self.var("PATH")?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(binary, Some(paths), cwd).ok()
    }
}

pub struct DiagnosticsProbe {
    env: ProbeEnv,
    timeout: Duration,
}

impl DiagnosticsProbe {
    pub fn new(env: ProbeEnv) -> Self {
        Self {
            env,
            timeout: VERSION_CHECK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the tools that the actions' commands start with.
    ///
    /// Returns one line per distinct finding, in first-seen order.
    pub async fn preflight(&self, actions: &[Action]) -> Vec<String> {
        let mut checks: HashMap<PathBuf, VersionCheck> = HashMap::new();
        let mut messages: Vec<String> = Vec::new();

        for action in actions {
            let Some(token) = first_token(&action.command) else {
                continue;
            };
            let Some(spec) = tools::spec_for_token(&token) else {
                continue;
            };
            let name = spec.binary;

            let message = if tools::is_explicit_path(&token) {
                let path = PathBuf::from(&token);
                if path.exists() {
                    let check = self.cached_check(&mut checks, path, spec).await;
                    describe(&format!("{name} (explicit)"), &check)
                } else {
                    format!("[FAIL] {name} path missing: {token}")
                }
            } else {
                match self.env.which(spec.binary) {
                    Some(path) => {
                        let check = self.cached_check(&mut checks, path, spec).await;
                        describe(name, &check)
                    }
                    None => format!("[FAIL] '{name}' not found in PATH"),
                }
            };

            debug!("preflight {}: {}", action.id, message);
            if !messages.contains(&message) {
                messages.push(message);
            }
        }

        messages
    }

    /// Status of every known dependency, regardless of what the actions use.
    pub async fn probe_status(&self) -> DiagnosticSnapshot {
        let mut snapshot = DiagnosticSnapshot::new();

        for spec in &tools::EXECUTABLE_TOOLS {
            let status = match tools::resolve(spec, &self.env) {
                Some(path) => {
                    let check = check_version(&path, spec.version_flag, self.timeout).await;
                    let state = if check.ok {
                        ToolState::Ok
                    } else {
                        ToolState::Warn
                    };
                    debug!("{} resolved to {}: {:?}", spec.binary, path.display(), state);
                    ToolStatus::new(state, check.headline())
                }
                None => ToolStatus::new(ToolState::Fail, ""),
            };
            snapshot.insert(spec.tool, status);
        }

        // The webhook is never called; only whether it is configured is known.
        let n8n = if self.env.var(N8N_WEBHOOK_ENV).is_some() {
            ToolStatus::new(ToolState::Ok, "configured")
        } else {
            ToolStatus::new(ToolState::Unknown, "not set")
        };
        snapshot.insert(Tool::N8n, n8n);

        snapshot
    }

    async fn cached_check(
        &self,
        checks: &mut HashMap<PathBuf, VersionCheck>,
        path: PathBuf,
        spec: &ToolSpec,
    ) -> VersionCheck {
        if let Some(check) = checks.get(&path) {
            return check.clone();
        }
        let check = check_version(&path, spec.version_flag, self.timeout).await;
        checks.insert(path, check.clone());
        check
    }
}

fn describe(label: &str, check: &VersionCheck) -> String {
    if check.ok {
        let headline = match check.headline() {
            "" => "version ok",
            line => line,
        };
        format!("[OK] {label}: {headline}")
    } else {
        format!("[WARN] {label}: {}", check.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, command: &str) -> Action {
        Action {
            id: id.to_string(),
            label: id.to_string(),
            command: command.to_string(),
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn missing_magick_reports_a_single_fail_line() {
        let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
        let msgs = probe
            .preflight(&[action("shot", "magick -version")])
            .await;
        assert_eq!(msgs, vec!["[FAIL] 'magick' not found in PATH".to_string()]);
    }

    #[tokio::test]
    async fn repeated_missing_tool_is_reported_once() {
        let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
        let msgs = probe
            .preflight(&[
                action("a", "tesseract a.png out"),
                action("b", "echo unrelated"),
                action("c", "Tesseract b.png out"),
                action("d", "magick convert x.png y.jpg"),
            ])
            .await;
        assert_eq!(
            msgs,
            vec![
                "[FAIL] 'tesseract' not found in PATH".to_string(),
                "[FAIL] 'magick' not found in PATH".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unrecognised_commands_produce_nothing() {
        let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
        let msgs = probe
            .preflight(&[
                action("a", "python kb_launch.py"),
                action("b", "\"unbalanced quote"),
                action("c", "   "),
            ])
            .await;
        assert!(msgs.is_empty(), "{msgs:?}");
    }

    #[tokio::test]
    async fn explicit_path_that_does_not_exist_fails() {
        let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
        let msgs = probe
            .preflight(&[action("ocr", "/no/such/dir/tesseract.exe in.png out")])
            .await;
        assert_eq!(
            msgs,
            vec!["[FAIL] tesseract path missing: /no/such/dir/tesseract.exe".to_string()]
        );
    }

    #[tokio::test]
    async fn status_always_has_the_four_tools() {
        let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
        let snap = probe.probe_status().await;

        let keys: Vec<&str> = snap.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["magick", "tesseract", "ffmpeg", "n8n"]);
        for key in ["magick", "tesseract", "ffmpeg"] {
            assert_eq!(snap.get(key).unwrap().state, ToolState::Fail);
        }
        assert_eq!(
            snap.get("n8n"),
            Some(&ToolStatus::new(ToolState::Unknown, "not set"))
        );
    }

    #[tokio::test]
    async fn configured_webhook_is_ok() {
        let env = ProbeEnv::isolated().with_var(N8N_WEBHOOK_ENV, "1");
        let snap = DiagnosticsProbe::new(env).probe_status().await;
        assert_eq!(
            snap.get("n8n"),
            Some(&ToolStatus::new(ToolState::Ok, "configured"))
        );
    }

    #[test]
    fn blank_variables_count_as_unset() {
        let env = ProbeEnv::isolated().with_var(N8N_WEBHOOK_ENV, "  ");
        assert!(env.var(N8N_WEBHOOK_ENV).is_none());
    }

    #[test]
    fn describe_falls_back_to_version_ok() {
        let check = VersionCheck {
            ok: true,
            text: String::new(),
        };
        assert_eq!(describe("magick", &check), "[OK] magick: version ok");
    }
}
