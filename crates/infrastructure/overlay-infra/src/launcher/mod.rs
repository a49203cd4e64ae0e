use camino::Utf8Path;
use overlay_config::{OUTPUT_CHUNK_SIZE, OUTPUT_DRAIN_TIMEOUT, STOP_GRACE_PERIOD};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod platform;
use crate::launcher::platform::shell_invocation;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Previous process still running")]
    Busy,
    #[error("Command is empty")]
    EmptyCommand,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// A chunk of stdout or stderr, in arrival order.
    Output(String),
    /// Sent exactly once per accepted run, after all output. `None` when killed by a signal.
    Finished { code: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
}

struct ActiveRun {
    pid: Option<u32>,
    cancel: CancellationToken,
}

/// Runs one shell command at a time and streams its output over `tx`.
///
/// Commands are never queued: `run` while a process is in flight returns
/// [`LaunchError::Busy`] and leaves the running process alone.
pub struct ProcessRunner {
    handle: Handle,
    tx: mpsc::Sender<RunnerEvent>,
    active: Arc<Mutex<Option<ActiveRun>>>,
}

fn lock_slot(slot: &Mutex<Option<ActiveRun>>) -> MutexGuard<'_, Option<ActiveRun>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProcessRunner {
    pub fn new(handle: Handle, tx: mpsc::Sender<RunnerEvent>) -> Self {
        Self {
            handle,
            tx,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> RunnerState {
        if lock_slot(&self.active).is_some() {
            RunnerState::Running
        } else {
            RunnerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunnerState::Running
    }

    pub fn run(&self, command: &str, cwd: Option<&Utf8Path>) -> Result<(), LaunchError> {
        if command.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let mut slot = lock_slot(&self.active);
        if let Some(run) = slot.as_ref() {
            warn!(
                "Rejected '{}': pid {:?} is still running",
                command, run.pid
            );
            return Err(LaunchError::Busy);
        }

        let inv = shell_invocation(command);
        let mut cmd = tokio::process::Command::new(&inv.program);
        cmd.args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir.as_std_path());
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let child = {
            let _guard = self.handle.enter();
            cmd.spawn()?
        };

        let pid = child.id();
        info!(
            "Launching program: {:?}, args: {:?}, cwd: {:?}, pid: {:?}",
            inv.program, inv.args, cwd, pid
        );

        let cancel = CancellationToken::new();
        *slot = Some(ActiveRun {
            pid,
            cancel: cancel.clone(),
        });
        drop(slot);

        self.handle.spawn(supervise(
            child,
            cancel,
            self.active.clone(),
            self.tx.clone(),
        ));
        Ok(())
    }

    /// Kills the running process and waits up to the grace period for it to be reaped.
    ///
    /// Returns `true` when a process was running and is gone afterwards. No-op when idle.
    pub fn stop(&self) -> bool {
        let cancel = match lock_slot(&self.active).as_ref() {
            Some(run) => run.cancel.clone(),
            None => return false,
        };
        cancel.cancel();

        let deadline = Instant::now() + STOP_GRACE_PERIOD;
        while self.is_running() {
            if Instant::now() >= deadline {
                warn!("Process did not exit within {:?}", STOP_GRACE_PERIOD);
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }
}

async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    slot: Arc<Mutex<Option<ActiveRun>>>,
    tx: mpsc::Sender<RunnerEvent>,
) {
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(tokio::spawn(forward_output(out, tx.clone())));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(tokio::spawn(forward_output(err, tx.clone())));
    }

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            debug!("Stop requested, killing pid {:?}", child.id());
            #[cfg(unix)]
            {
                if let Some(pid) = child.id() {
                    if let Err(e) = platform::kill_process_group(pid) {
                        warn!("Failed to kill process group {pid}: {e}");
                    }
                }
            }
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill process: {e}");
            }
            child.wait().await
        }
    };

    // A grandchild that inherited the pipes can keep them open after the shell exits.
    let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    let drained = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async move {
        for reader in readers {
            let _ = reader.await;
        }
    })
    .await;
    if drained.is_err() {
        debug!("Output pipes still open {:?} after exit", OUTPUT_DRAIN_TIMEOUT);
        for abort in aborts {
            abort.abort();
        }
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Failed to wait for process: {e}");
            None
        }
    };

    lock_slot(&slot).take();
    info!("Process finished ({:?})", code);
    let _ = tx.send(RunnerEvent::Finished { code }).await;
}

async fn forward_output<R>(mut reader: R, tx: mpsc::Sender<RunnerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; OUTPUT_CHUNK_SIZE];
    let mut pending = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Output stream closed: {e}");
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);
        let text = take_decoded(&mut pending);
        if !text.is_empty() {
            // Keep reading even without a receiver so the child never blocks on a full pipe.
            let _ = tx.send(RunnerEvent::Output(text)).await;
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        let _ = tx.send(RunnerEvent::Output(text)).await;
    }
}

/// Decodes everything in `pending` except an incomplete UTF-8 sequence at the end,
/// which stays behind for the next chunk.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    let keep = match std::str::from_utf8(pending) {
        Err(e) if e.error_len().is_none() => pending.len() - e.valid_up_to(),
        _ => 0,
    };
    let tail = pending.split_off(pending.len() - keep);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = tail;
    text
}

#[cfg(target_os = "windows")]
fn split_command_windows(cmd: &str) -> Option<Vec<String>> {
    // POSIX shlex treats `\` as an escape and turns `C:\tools\magick.exe` into
    // `C:toolsmagick.exe`; Windows commands only need double-quote grouping.
    let mut parts = Vec::<String>::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in cmd.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return None;
    }

    if !current.is_empty() {
        parts.push(current);
    }

    Some(parts)
}

/// Splits a command line into words, or `None` when quoting is unbalanced.
pub fn split_command(cmd: &str) -> Option<Vec<String>> {
    #[cfg(target_os = "windows")]
    {
        split_command_windows(cmd)
    }
    #[cfg(not(target_os = "windows"))]
    {
        shlex::split(cmd)
    }
}

/// First word of a command line, falling back to plain whitespace splitting
/// when the line cannot be parsed.
pub fn first_token(cmd: &str) -> Option<String> {
    match split_command(cmd) {
        Some(parts) => parts.into_iter().next(),
        None => cmd.split_whitespace().next().map(str::to_string),
    }
}
