use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::diagnostics::DiagnosticsWorker;
use crate::domain::{AppSettings, ProfileCatalog, StatusSnapshotFile};
use crate::events::{CoreEvent, RefreshId, ReleaseHandle};
use crate::pins::PinStore;
use crate::ports::{Notifier, PinsRepo, SettingsRepo, StatusRepo};
use crate::registry::ActionRegistry;
use overlay_config::EVENT_QUEUE_CAPACITY;
use overlay_core::{formats::load_profile, Action, ActionId, DiagnosticSnapshot};
use overlay_infra::{DiagnosticsProbe, LaunchError, ProcessRunner, RunnerEvent, RunnerState};

/// Owns the active mode, its actions, the pins and the runner, and reports
/// every change to the shell through `N`.
///
/// Driven from a single thread: call the operations directly and `tick()`
/// regularly to deliver process output and diagnostics results.
pub struct AppKernel<S, P, D, N> {
    catalog: ProfileCatalog,
    settings_repo: Arc<S>,
    status_repo: Arc<D>,
    notifier: N,

    settings: AppSettings,
    registry: ActionRegistry,
    pins: PinStore<P>,
    runner: ProcessRunner,
    diagnostics: DiagnosticsWorker,
    status: Option<DiagnosticSnapshot>,
    click_through: bool,
    release_requested: Arc<AtomicBool>,
    reload_error: Option<String>,

    pending_status: Option<RefreshId>,
    pending_preflight: Option<RefreshId>,

    runner_rx: mpsc::Receiver<RunnerEvent>,
    tx: mpsc::Sender<CoreEvent>,
    rx: mpsc::Receiver<CoreEvent>,
}

impl<S, P, D, N> AppKernel<S, P, D, N>
where
    S: SettingsRepo,
    P: PinsRepo,
    D: StatusRepo,
    N: Notifier,
{
    pub fn new(
        catalog: ProfileCatalog,
        settings: S,
        pins: P,
        status: D,
        probe: DiagnosticsProbe,
        notifier: N,
    ) -> anyhow::Result<Self> {
        let handle = crate::async_runtime::runtime()?.handle().clone();
        let (runner_tx, runner_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        Ok(Self {
            catalog,
            settings_repo: Arc::new(settings),
            status_repo: Arc::new(status),
            notifier,
            settings: AppSettings::default(),
            registry: ActionRegistry::new(),
            pins: PinStore::new(Arc::new(pins)),
            runner: ProcessRunner::new(handle, runner_tx),
            diagnostics: DiagnosticsWorker::new(probe, tx.clone()),
            status: None,
            click_through: false,
            release_requested: Arc::new(AtomicBool::new(false)),
            reload_error: None,
            pending_status: None,
            pending_preflight: None,
            runner_rx,
            tx,
            rx,
        })
    }

    /// Restores the persisted mode, pins and last status, loads the mode's
    /// actions and starts a diagnostics refresh.
    pub fn boot(&mut self) {
        self.settings = match self.settings_repo.load() {
            Ok(settings) => settings,
            Err(e) => {
                self.log(&format!("[WARN] settings: {e:#}"));
                AppSettings::default()
            }
        };

        if self.catalog.find(&self.settings.mode).is_none() {
            let fallback = self.catalog.default_mode().unwrap_or_default().to_string();
            warn!(
                "Unknown mode '{}' in settings, using '{}'",
                self.settings.mode, fallback
            );
            self.settings.mode = fallback;
        }
        info!("Booting in mode '{}'", self.settings.mode);

        if let Err(e) = self.pins.load() {
            self.log(&format!("[WARN] pins: {e:#}"));
        }

        match self.status_repo.load() {
            Ok(Some(saved)) => {
                debug!("Restored status from {}", saved.checked_at);
                self.notifier.on_status_changed(&saved.tools);
                self.status = Some(saved.tools);
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring saved status: {e:#}"),
        }

        if self.load_registry() {
            self.revalidate_pins();
        }
        self.notifier.on_pins_changed(self.pins.ids());
        self.refresh_diagnostics();
    }

    /// Switches to another mode. Returns `false` for unknown or already active modes.
    ///
    /// The switch stands even when the new profile fails to load; the previous
    /// actions stay and [`Self::last_reload_error`] says why.
    pub fn set_mode(&mut self, name: &str) -> bool {
        if name == self.settings.mode {
            debug!("Mode '{name}' already active");
            return false;
        }
        if self.catalog.find(name).is_none() {
            self.log(&format!("[ERR] Unknown mode '{name}'"));
            return false;
        }

        self.settings.mode = name.to_string();
        if let Err(e) = self.settings_repo.save(&self.settings) {
            self.log(&format!("[ERR] failed to save settings: {e:#}"));
        }
        info!("Mode changed to '{name}'");
        self.notifier.on_notify(&format!("Mode: {name}"));

        if self.load_registry() {
            self.revalidate_pins();
        }
        self.refresh_diagnostics();
        true
    }

    /// Re-reads the active profile. On failure the current actions stay.
    pub fn reload_actions(&mut self) -> bool {
        if !self.load_registry() {
            return false;
        }
        self.revalidate_pins();
        self.start_preflight();
        true
    }

    pub fn run_action(&mut self, id: &str) -> bool {
        let Some(action) = self.registry.lookup(id).cloned() else {
            self.log(&format!("[ERR] Action '{id}' not found"));
            return false;
        };

        self.log(&format!("[RUN] {}", action.command));
        let cwd = action.working_dir.as_deref().map(camino::Utf8Path::new);
        match self.runner.run(&action.command, cwd) {
            Ok(()) => true,
            Err(LaunchError::Busy) => {
                self.log("[WARN] Previous process still running");
                false
            }
            Err(e) => {
                self.log(&format!("[ERR] {id}: {e}"));
                false
            }
        }
    }

    pub fn stop_process(&mut self) -> bool {
        if !self.runner.stop() {
            return false;
        }
        self.notifier.on_notify("Process stopped");
        true
    }

    pub fn pin(&mut self, id: &str) -> bool {
        if !self.registry.contains(id) {
            self.log(&format!("[ERR] Action '{id}' not found"));
            return false;
        }
        let outcome = self.pins.pin(id);
        self.apply_pin_change(outcome)
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        let outcome = self.pins.unpin(id);
        self.apply_pin_change(outcome)
    }

    pub fn move_pin(&mut self, from: usize, to: usize) -> bool {
        let outcome = self.pins.move_pin(from, to);
        self.apply_pin_change(outcome)
    }

    /// Starts a status probe and a preflight of the current actions.
    /// Results of any earlier refresh still in flight are discarded.
    pub fn refresh_diagnostics(&mut self) {
        let refresh_id = uuid::Uuid::new_v4();
        match self.diagnostics.start_status_probe(refresh_id) {
            Ok(()) => self.pending_status = Some(refresh_id),
            Err(e) => self.log(&format!("[ERR] Failed to start status probe: {e}")),
        }
        self.start_preflight();
    }

    pub fn run_preflight(&mut self) {
        self.start_preflight();
    }

    pub fn toggle_click_through(&mut self) -> bool {
        self.set_click_through(!self.click_through);
        self.click_through
    }

    /// Turns click-through off immediately. Safe to repeat.
    pub fn panic(&mut self) {
        self.release_input("panic");
    }

    pub fn release_handle(&self) -> ReleaseHandle {
        ReleaseHandle::new(self.release_requested.clone())
    }

    /// Why the most recent profile load failed, `None` after a successful one.
    pub fn last_reload_error(&self) -> Option<&str> {
        self.reload_error.as_deref()
    }

    pub fn sender(&self) -> mpsc::Sender<CoreEvent> {
        self.tx.clone()
    }

    /// Delivers runner output and finished diagnostics to the notifier.
    pub fn tick(&mut self) {
        while let Ok(event) = self.runner_rx.try_recv() {
            match event {
                RunnerEvent::Output(text) => self.notifier.on_output(&text),
                RunnerEvent::Finished { code } => {
                    let shown = code.map_or_else(|| "killed".to_string(), |c| c.to_string());
                    self.notifier
                        .on_notify(&format!("Process finished ({shown})"));
                    self.notifier.on_process_finished(code);
                }
            }
        }

        while let Ok(event) = self.rx.try_recv() {
            match event {
                CoreEvent::StatusProbed {
                    refresh_id,
                    snapshot,
                } => {
                    if self.pending_status != Some(refresh_id) {
                        debug!("Ignoring stale status probe {refresh_id}");
                        continue;
                    }
                    self.pending_status = None;
                    self.apply_status(snapshot);
                }
                CoreEvent::PreflightFinished {
                    refresh_id,
                    messages,
                } => {
                    if self.pending_preflight != Some(refresh_id) {
                        debug!("Ignoring stale preflight {refresh_id}");
                        continue;
                    }
                    self.pending_preflight = None;
                    for line in &messages {
                        self.notifier.on_log(line);
                    }
                }
                CoreEvent::DiagnosticsFailed {
                    refresh_id,
                    message,
                } => {
                    if self.pending_status == Some(refresh_id) {
                        self.pending_status = None;
                    }
                    if self.pending_preflight == Some(refresh_id) {
                        self.pending_preflight = None;
                    }
                    self.log(&format!("[ERR] diagnostics: {message}"));
                }
            }
        }
        if self.release_requested.swap(false, Ordering::AcqRel) {
            self.release_input("panic hotkey");
        }
    }

    pub fn diagnostics_pending(&self) -> bool {
        self.pending_status.is_some() || self.pending_preflight.is_some()
    }

    pub fn mode(&self) -> &str {
        &self.settings.mode
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn actions(&self) -> &[Action] {
        self.registry.actions()
    }

    pub fn pins(&self) -> &[ActionId] {
        self.pins.ids()
    }

    pub fn status(&self) -> Option<&DiagnosticSnapshot> {
        self.status.as_ref()
    }

    pub fn click_through(&self) -> bool {
        self.click_through
    }

    pub fn runner_state(&self) -> RunnerState {
        self.runner.state()
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    fn log(&mut self, line: &str) {
        self.notifier.on_log(line);
    }

    /// Loads the active profile into the registry. Leaves it untouched on error.
    fn load_registry(&mut self) -> bool {
        let Some(source) = self
            .catalog
            .find(&self.settings.mode)
            .map(|p| p.source.clone())
        else {
            let reason = format!("unknown mode '{}'", self.settings.mode);
            self.log(&format!("[ERR] reload: {reason}"));
            self.reload_error = Some(reason);
            return false;
        };

        match load_profile(&source) {
            Ok(actions) => {
                info!("Loaded {} actions from {}", actions.len(), source);
                self.registry.replace(actions);
                self.reload_error = None;
                self.notifier.on_actions_changed(self.registry.actions());
                true
            }
            Err(e) => {
                warn!("Keeping previous actions, {:?} error: {e}", e.kind());
                self.log(&format!("[ERR] reload: {e}"));
                self.reload_error = Some(e.to_string());
                false
            }
        }
    }

    fn revalidate_pins(&mut self) {
        match self.pins.revalidate(&self.registry) {
            Ok(dropped) if dropped.is_empty() => {}
            Ok(_) => self.notifier.on_pins_changed(self.pins.ids()),
            Err(e) => {
                self.log(&format!("[ERR] failed to save pins: {e:#}"));
                self.notifier.on_pins_changed(self.pins.ids());
            }
        }
    }

    fn apply_pin_change(&mut self, outcome: anyhow::Result<bool>) -> bool {
        match outcome {
            Ok(false) => false,
            Ok(true) => {
                self.notifier.on_pins_changed(self.pins.ids());
                true
            }
            Err(e) => {
                // The list changed in memory even though saving failed.
                self.log(&format!("[ERR] failed to save pins: {e:#}"));
                self.notifier.on_pins_changed(self.pins.ids());
                true
            }
        }
    }

    fn start_preflight(&mut self) {
        let refresh_id = uuid::Uuid::new_v4();
        let actions = self.registry.actions().to_vec();
        match self.diagnostics.start_preflight(refresh_id, actions) {
            Ok(()) => self.pending_preflight = Some(refresh_id),
            Err(e) => self.log(&format!("[ERR] Failed to start preflight: {e}")),
        }
    }

    fn apply_status(&mut self, snapshot: DiagnosticSnapshot) {
        let file = StatusSnapshotFile {
            checked_at: chrono::Utc::now(),
            tools: snapshot.clone(),
        };
        if let Err(e) = self.status_repo.save(&file) {
            warn!("Failed to save status snapshot: {e:#}");
        }
        self.notifier.on_status_changed(&snapshot);
        self.status = Some(snapshot);
    }

    fn set_click_through(&mut self, enabled: bool) {
        if self.click_through == enabled {
            return;
        }
        self.click_through = enabled;
        let state = if enabled { "ON" } else { "OFF" };
        self.notifier.on_notify(&format!("Click-through: {state}"));
        self.notifier.on_click_through_changed(enabled);
    }

    fn release_input(&mut self, reason: &str) {
        if !self.click_through {
            debug!("Release ({reason}) with click-through already off");
            return;
        }
        self.click_through = false;
        self.notifier
            .on_notify(&format!("Click-through: OFF ({reason})"));
        self.notifier.on_click_through_changed(false);
    }
}
