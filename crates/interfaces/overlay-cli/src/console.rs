use overlay_app_core::Notifier;
use overlay_core::{Action, ActionId, DiagnosticSnapshot};
use std::io::Write;
use tracing::debug;

type Sink = Box<dyn Write + Send>;

/// Prints kernel callbacks to the terminal.
///
/// Process output goes to stdout untouched so it can be piped. Log lines and
/// notices go to stderr. Collection updates are only traced; the commands
/// print what they need.
pub struct ConsoleNotifier {
    quiet: bool,
    last_exit: Option<Option<i32>>,
    out: Sink,
    err: Sink,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::with_writers(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    /// Drops log lines and notices, keeping only process output.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }

    pub fn with_writers(out: Sink, err: Sink) -> Self {
        Self {
            quiet: false,
            last_exit: None,
            out,
            err,
        }
    }

    /// `Some(code)` once a run has finished, where `code` is `None` if it was killed.
    pub fn take_exit(&mut self) -> Option<Option<i32>> {
        self.last_exit.take()
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConsoleNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleNotifier")
            .field("quiet", &self.quiet)
            .field("last_exit", &self.last_exit)
            .finish_non_exhaustive()
    }
}

impl Notifier for ConsoleNotifier {
    fn on_log(&mut self, line: &str) {
        if !self.quiet {
            let _ = writeln!(self.err, "{line}");
        }
    }

    fn on_output(&mut self, chunk: &str) {
        let _ = self.out.write_all(chunk.as_bytes());
        let _ = self.out.flush();
    }

    fn on_notify(&mut self, message: &str) {
        if !self.quiet {
            let _ = writeln!(self.err, "» {message}");
        }
    }

    fn on_actions_changed(&mut self, actions: &[Action]) {
        debug!("{} actions loaded", actions.len());
    }

    fn on_pins_changed(&mut self, pins: &[ActionId]) {
        debug!("pins: {:?}", pins);
    }

    fn on_status_changed(&mut self, snapshot: &DiagnosticSnapshot) {
        debug!("status updated for {} tools", snapshot.len());
    }

    fn on_process_finished(&mut self, code: Option<i32>) {
        self.last_exit = Some(code);
    }
}
