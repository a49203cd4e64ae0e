use overlay_core::DiagnosticSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tags one diagnostics request so late results from a superseded one are dropped.
pub type RefreshId = uuid::Uuid;

#[derive(Debug, Clone)]
pub enum CoreEvent {
    StatusProbed {
        refresh_id: RefreshId,
        snapshot: DiagnosticSnapshot,
    },
    PreflightFinished {
        refresh_id: RefreshId,
        messages: Vec<String>,
    },
    DiagnosticsFailed {
        refresh_id: RefreshId,
        message: String,
    },
}

/// Cloneable handle a global hotkey thread uses to force click-through off.
///
/// Safe to call from any thread. Requests set a flag the next kernel tick
/// consumes, so any number of them between two ticks count as one and none
/// is lost to a busy event queue.
#[derive(Debug, Clone)]
pub struct ReleaseHandle {
    requested: Arc<AtomicBool>,
}

impl ReleaseHandle {
    pub(crate) fn new(requested: Arc<AtomicBool>) -> Self {
        Self { requested }
    }

    pub fn release(&self) {
        self.requested.store(true, Ordering::Release);
    }
}
