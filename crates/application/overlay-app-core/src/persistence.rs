use crate::domain::{AppSettings, StatusSnapshotFile};
use crate::ports::{PinsRepo, SettingsRepo, StatusRepo};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use overlay_config::{PROFILE_DIR_ENV, STATE_DIR_ENV};
use overlay_core::ActionId;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const QUALIFIER: &str = "com";
const ORG: &str = "overlay";
const APP: &str = "router";

/// JSON files under the per-user config dir, or under an explicit root.
#[derive(Debug, Clone, Default)]
pub struct FilePersistence {
    root: Option<PathBuf>,
}

impl FilePersistence {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Honors `OVERLAY_STATE_DIR`, otherwise the per-user config dir.
    pub fn from_env() -> Self {
        match std::env::var_os(STATE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::at(dir),
            _ => Self::new(),
        }
    }

    fn config_dir(&self) -> Result<PathBuf> {
        let dir = match &self.root {
            Some(root) => root.clone(),
            None => project_dirs()?.config_dir().to_path_buf(),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(dir)
    }

    fn settings_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("settings.json"))
    }

    fn pins_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("pins.json"))
    }

    fn status_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("status.json"))
    }

    pub fn load_settings(&self) -> Result<AppSettings> {
        let path = self.settings_path()?;
        if !path.exists() {
            return Ok(AppSettings::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read settings")?;
        let settings: AppSettings =
            serde_json::from_str(&content).context("Failed to parse settings")?;
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let path = self.settings_path()?;
        let json = serde_json::to_string_pretty(settings)?;
        atomic_write(&path, json.as_bytes()).context("Failed to write settings")?;
        Ok(())
    }

    pub fn load_pins(&self) -> Result<Vec<ActionId>> {
        let path = self.pins_path()?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).context("Failed to read pins")?;
        let pins: Vec<ActionId> = serde_json::from_str(&content).context("Failed to parse pins")?;
        Ok(pins)
    }

    pub fn save_pins(&self, pins: &[ActionId]) -> Result<()> {
        let path = self.pins_path()?;
        let json = serde_json::to_string_pretty(pins)?;
        atomic_write(&path, json.as_bytes()).context("Failed to write pins")?;
        Ok(())
    }

    pub fn load_status(&self) -> Result<Option<StatusSnapshotFile>> {
        let path = self.status_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).context("Failed to read status snapshot")?;
        let snapshot = serde_json::from_str(&content).context("Failed to parse status snapshot")?;
        Ok(Some(snapshot))
    }

    pub fn save_status(&self, snapshot: &StatusSnapshotFile) -> Result<()> {
        let path = self.status_path()?;
        let json = serde_json::to_string_pretty(snapshot)?;
        atomic_write(&path, json.as_bytes()).context("Failed to write status snapshot")?;
        Ok(())
    }
}

impl SettingsRepo for FilePersistence {
    fn load(&self) -> Result<AppSettings> {
        self.load_settings()
    }

    fn save(&self, settings: &AppSettings) -> Result<()> {
        self.save_settings(settings)
    }
}

impl PinsRepo for FilePersistence {
    fn load(&self) -> Result<Vec<ActionId>> {
        self.load_pins()
    }

    fn save(&self, pins: &[ActionId]) -> Result<()> {
        self.save_pins(pins)
    }
}

impl StatusRepo for FilePersistence {
    fn load(&self) -> Result<Option<StatusSnapshotFile>> {
        self.load_status()
    }

    fn save(&self, snapshot: &StatusSnapshotFile) -> Result<()> {
        self.save_status(snapshot)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORG, APP)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Where the mode profiles live: `OVERLAY_PROFILE_DIR`, else `<config dir>/profiles`.
pub fn default_profile_dir() -> Result<Utf8PathBuf> {
    if let Some(dir) = std::env::var_os(PROFILE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Utf8PathBuf::from_path_buf(PathBuf::from(dir))
            .map_err(|p| anyhow::anyhow!("Profile dir is not valid UTF-8: {}", p.display()));
    }
    let dir = project_dirs()?.config_dir().join("profiles");
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|p| anyhow::anyhow!("Profile dir is not valid UTF-8: {}", p.display()))
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    };

    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file {}", tmp_path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write temp file {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {}", tmp_path.display()))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp_path, path) {
        if e.kind() != std::io::ErrorKind::AlreadyExists {
            return Err(e).with_context(|| {
                format!("Failed to move {} into place", tmp_path.display())
            });
        }
        // Some filesystems refuse to rename over an existing file.
        fs::remove_file(path).ok();
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
    }

    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
