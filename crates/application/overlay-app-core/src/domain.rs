use camino::Utf8Path;
use chrono::{DateTime, Utc};
use overlay_config::{BUILTIN_PROFILES, DEFAULT_MODE};
use overlay_core::{DiagnosticSnapshot, Profile};
use serde::{Deserialize, Serialize};

fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}

/// User state persisted between runs, apart from the pin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
        }
    }
}

/// Last accepted diagnostics result, as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshotFile {
    pub checked_at: DateTime<Utc>,
    pub tools: DiagnosticSnapshot,
}

/// The fixed set of modes and the profile file behind each.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<Profile>,
}

impl ProfileCatalog {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    /// The built-in modes with their files under `profile_dir`.
    pub fn builtin(profile_dir: &Utf8Path) -> Self {
        let profiles = BUILTIN_PROFILES
            .iter()
            .map(|(name, file)| Profile {
                name: name.to_string(),
                source: profile_dir.join(file),
            })
            .collect();
        Self { profiles }
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// `default` when the catalog has it, otherwise the first entry.
    pub fn default_mode(&self) -> Option<&str> {
        self.find(DEFAULT_MODE)
            .or_else(|| self.profiles.first())
            .map(|p| p.name.as_str())
    }
}
