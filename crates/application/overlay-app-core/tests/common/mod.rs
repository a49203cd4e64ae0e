#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use overlay_app_core::{AppKernel, FilePersistence, Notifier, ProfileCatalog};
use overlay_core::{Action, ActionId, DiagnosticSnapshot, Profile};
use overlay_infra::{DiagnosticsProbe, ProbeEnv};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Recorder {
    pub logs: Vec<String>,
    pub output: String,
    pub notices: Vec<String>,
    pub action_updates: Vec<Vec<ActionId>>,
    pub pin_updates: Vec<Vec<ActionId>>,
    pub status_updates: usize,
    pub click_through: Vec<bool>,
    /// Callback names in the order they arrived, logs excluded.
    pub calls: Vec<&'static str>,
    /// When set, each actions update snapshots this file's contents.
    pub watch_file: Option<Utf8PathBuf>,
    pub watched_at_actions: Vec<Option<String>>,
}

impl Notifier for Recorder {
    fn on_log(&mut self, line: &str) {
        self.logs.push(line.to_string());
    }

    fn on_output(&mut self, chunk: &str) {
        self.output.push_str(chunk);
    }

    fn on_notify(&mut self, message: &str) {
        self.calls.push("notify");
        self.notices.push(message.to_string());
    }

    fn on_actions_changed(&mut self, actions: &[Action]) {
        self.calls.push("actions");
        if let Some(path) = &self.watch_file {
            self.watched_at_actions
                .push(std::fs::read_to_string(path).ok());
        }
        self.action_updates
            .push(actions.iter().map(|a| a.id.clone()).collect());
    }

    fn on_pins_changed(&mut self, pins: &[ActionId]) {
        self.calls.push("pins");
        self.pin_updates.push(pins.to_vec());
    }

    fn on_status_changed(&mut self, _snapshot: &DiagnosticSnapshot) {
        self.calls.push("status");
        self.status_updates += 1;
    }

    fn on_click_through_changed(&mut self, enabled: bool) {
        self.click_through.push(enabled);
    }
}

pub type TestKernel = AppKernel<FilePersistence, FilePersistence, FilePersistence, Recorder>;

pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("profiles")).unwrap();
        std::fs::create_dir_all(dir.path().join("state")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> Utf8PathBuf {
        Utf8Path::from_path(self.dir.path()).unwrap().to_owned()
    }

    pub fn state_dir(&self) -> Utf8PathBuf {
        self.root().join("state")
    }

    pub fn write_profile(&self, file: &str, yaml: &str) {
        std::fs::write(self.root().join("profiles").join(file), yaml).unwrap();
    }

    pub fn catalog(&self) -> ProfileCatalog {
        let dir = self.root().join("profiles");
        ProfileCatalog::new(vec![
            Profile {
                name: "default".into(),
                source: dir.join("actions.yaml"),
            },
            Profile {
                name: "studio".into(),
                source: dir.join("studio.yaml"),
            },
        ])
    }

    pub fn store(&self) -> FilePersistence {
        FilePersistence::at(self.state_dir())
    }

    pub fn kernel(&self) -> TestKernel {
        AppKernel::new(
            self.catalog(),
            self.store(),
            self.store(),
            self.store(),
            DiagnosticsProbe::new(ProbeEnv::isolated()),
            Recorder::default(),
        )
        .unwrap()
    }

    pub fn booted(&self) -> TestKernel {
        let mut kernel = self.kernel();
        kernel.boot();
        kernel
    }
}

/// Ticks until `done` holds or the deadline passes.
pub fn tick_until(kernel: &mut TestKernel, done: impl Fn(&TestKernel) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        kernel.tick();
        if done(kernel) {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

pub const DEFAULT_PROFILE: &str = r#"
actions:
  shot:
    label: Screenshot
    command: magick -version
  reel:
    command: echo reel
  ping:
    command: echo ping
"#;

pub const STUDIO_PROFILE: &str = r#"
actions:
  reel:
    label: Reel (studio)
    command: echo studio reel
"#;
