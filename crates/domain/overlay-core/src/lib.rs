use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod formats;

pub use error::{ConfigError, ConfigErrorKind};

pub type ActionId = String;

/// A named shell command declared in a profile file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    pub id: ActionId,
    pub label: String,
    pub command: String,
    /// Passed to the runner as-is; never resolved or validated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

/// A mode name bound to the profile file it loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub source: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolState {
    #[default]
    Unknown,
    Ok,
    Warn,
    Fail,
}

impl ToolState {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolState::Unknown => "unknown",
            ToolState::Ok => "ok",
            ToolState::Warn => "warn",
            ToolState::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolStatus {
    pub state: ToolState,
    pub version: String,
}

impl ToolStatus {
    pub fn new(state: ToolState, version: impl Into<String>) -> Self {
        Self {
            state,
            version: version.into(),
        }
    }
}

/// The fixed set of external dependencies the status probe reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Magick,
    Tesseract,
    Ffmpeg,
    N8n,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Magick, Tool::Tesseract, Tool::Ffmpeg, Tool::N8n];

    /// Key used in status snapshots.
    pub fn key(self) -> &'static str {
        match self {
            Tool::Magick => "magick",
            Tool::Tesseract => "tesseract",
            Tool::Ffmpeg => "ffmpeg",
            Tool::N8n => "n8n",
        }
    }
}

/// Tool key -> status, in probe order. Each probe produces a complete replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticSnapshot(IndexMap<String, ToolStatus>);

impl DiagnosticSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: Tool, status: ToolStatus) {
        self.0.insert(tool.key().to_string(), status);
    }

    pub fn get(&self, key: &str) -> Option<&ToolStatus> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolStatus)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_state_serializes_lowercase() {
        let status = ToolStatus::new(ToolState::Warn, "magick 7.1");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"state":"warn","version":"magick 7.1"}"#);
    }

    #[test]
    fn snapshot_keeps_probe_order() {
        let mut snap = DiagnosticSnapshot::new();
        for tool in Tool::ALL {
            snap.insert(tool, ToolStatus::default());
        }
        let keys: Vec<&str> = snap.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["magick", "tesseract", "ffmpeg", "n8n"]);
    }
}
