use crate::events::{CoreEvent, RefreshId};
use overlay_core::Action;
use overlay_infra::DiagnosticsProbe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Runs probes on background threads and posts their results to the kernel queue.
pub struct DiagnosticsWorker {
    probe: Arc<DiagnosticsProbe>,
    tx: mpsc::Sender<CoreEvent>,
}

impl DiagnosticsWorker {
    pub fn new(probe: DiagnosticsProbe, tx: mpsc::Sender<CoreEvent>) -> Self {
        Self {
            probe: Arc::new(probe),
            tx,
        }
    }

    pub fn start_status_probe(&self, refresh_id: RefreshId) -> anyhow::Result<()> {
        let probe = self.probe.clone();
        let tx = self.tx.clone();

        std::thread::Builder::new()
            .name("overlay-status-probe".to_string())
            .spawn(move || {
                let rt = match crate::async_runtime::runtime() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("{e:#}");
                        let _ = tx.blocking_send(CoreEvent::DiagnosticsFailed {
                            refresh_id,
                            message: format!("{e:#}"),
                        });
                        return;
                    }
                };
                let snapshot = rt.block_on(probe.probe_status());
                debug!("Status probe {refresh_id} finished");
                let _ = tx.blocking_send(CoreEvent::StatusProbed {
                    refresh_id,
                    snapshot,
                });
            })?;

        Ok(())
    }

    pub fn start_preflight(&self, refresh_id: RefreshId, actions: Vec<Action>) -> anyhow::Result<()> {
        let probe = self.probe.clone();
        let tx = self.tx.clone();

        std::thread::Builder::new()
            .name("overlay-preflight".to_string())
            .spawn(move || {
                let rt = match crate::async_runtime::runtime() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("{e:#}");
                        let _ = tx.blocking_send(CoreEvent::DiagnosticsFailed {
                            refresh_id,
                            message: format!("{e:#}"),
                        });
                        return;
                    }
                };
                let messages = rt.block_on(probe.preflight(&actions));
                debug!("Preflight {refresh_id} produced {} lines", messages.len());
                let _ = tx.blocking_send(CoreEvent::PreflightFinished {
                    refresh_id,
                    messages,
                });
            })?;

        Ok(())
    }
}
