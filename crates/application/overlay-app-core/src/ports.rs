use crate::domain::{AppSettings, StatusSnapshotFile};
use overlay_core::{Action, ActionId, DiagnosticSnapshot};

pub trait SettingsRepo: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<AppSettings>;
    fn save(&self, settings: &AppSettings) -> anyhow::Result<()>;
}

pub trait PinsRepo: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<Vec<ActionId>>;
    fn save(&self, pins: &[ActionId]) -> anyhow::Result<()>;
}

pub trait StatusRepo: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<Option<StatusSnapshotFile>>;
    fn save(&self, snapshot: &StatusSnapshotFile) -> anyhow::Result<()>;
}

/// Callbacks into the UI shell. Always invoked on the thread driving the kernel.
pub trait Notifier {
    /// Diagnostic and progress lines (`[RUN] ...`, `[ERR] ...`).
    fn on_log(&mut self, line: &str);

    /// Raw output of the running action, chunk by chunk.
    fn on_output(&mut self, chunk: &str) {
        self.on_log(chunk);
    }

    /// Short user-facing messages (toasts, tray balloons).
    fn on_notify(&mut self, message: &str);

    fn on_actions_changed(&mut self, actions: &[Action]);

    fn on_pins_changed(&mut self, pins: &[ActionId]);

    fn on_status_changed(&mut self, snapshot: &DiagnosticSnapshot);

    fn on_click_through_changed(&mut self, _enabled: bool) {}

    /// Exit code of the finished action, `None` when it was killed.
    fn on_process_finished(&mut self, _code: Option<i32>) {}
}
