use crate::CliKernel;
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use overlay_infra::RunnerState;
use std::io::Write;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(50);

pub fn cmd_list(kernel: &CliKernel, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Mode: {}", kernel.mode())?;
    if kernel.actions().is_empty() {
        writeln!(out, "No actions.")?;
        return Ok(());
    }

    let width = kernel.actions().iter().map(|a| a.id.len()).max().unwrap_or(0);
    for action in kernel.actions() {
        let marker = if kernel.pins().contains(&action.id) {
            '*'
        } else {
            ' '
        };
        writeln!(
            out,
            "{marker} {:width$}  {}  ({})",
            action.id, action.label, action.command
        )?;
    }
    Ok(())
}

pub fn cmd_modes(kernel: &CliKernel, out: &mut impl Write) -> Result<()> {
    for profile in kernel.catalog().profiles() {
        let marker = if profile.name == kernel.mode() { '>' } else { ' ' };
        let missing = if profile.source.exists() {
            ""
        } else {
            " (missing)"
        };
        writeln!(out, "{marker} {:8} {}{missing}", profile.name, profile.source)?;
    }
    Ok(())
}

pub fn cmd_mode(kernel: &mut CliKernel, name: Option<String>, out: &mut impl Write) -> Result<()> {
    let Some(name) = name else {
        writeln!(out, "{}", kernel.mode())?;
        return Ok(());
    };

    if kernel.catalog().find(&name).is_none() {
        bail!("Unknown mode '{name}'");
    }
    if !kernel.set_mode(&name) {
        writeln!(out, "Already in mode {name}")?;
        return Ok(());
    }
    if let Some(reason) = kernel.last_reload_error() {
        bail!("Mode {name} is active but its actions failed to load: {reason}");
    }
    writeln!(out, "Mode: {name} ({} actions)", kernel.actions().len())?;
    Ok(())
}

pub fn cmd_pins(kernel: &CliKernel, out: &mut impl Write) -> Result<()> {
    if kernel.pins().is_empty() {
        writeln!(out, "No pinned actions.")?;
        return Ok(());
    }
    for (i, id) in kernel.pins().iter().enumerate() {
        writeln!(out, "{:>2}. {id}", i + 1)?;
    }
    Ok(())
}

pub fn cmd_pin(kernel: &mut CliKernel, id: &str, out: &mut impl Write) -> Result<()> {
    if !kernel.actions().iter().any(|a| a.id == id) {
        bail!("Action '{id}' not found in mode {}", kernel.mode());
    }
    kernel.pin(id);
    cmd_pins(kernel, out)
}

pub fn cmd_unpin(kernel: &mut CliKernel, id: &str, out: &mut impl Write) -> Result<()> {
    if !kernel.unpin(id) {
        writeln!(out, "'{id}' was not pinned")?;
    }
    cmd_pins(kernel, out)
}

/// Positions are 1-based, as printed by `pins`.
pub fn cmd_move(kernel: &mut CliKernel, from: usize, to: usize, out: &mut impl Write) -> Result<()> {
    let count = kernel.pins().len();
    let (Some(from), Some(to)) = (from.checked_sub(1), to.checked_sub(1)) else {
        bail!("Positions start at 1");
    };
    if from >= count || to >= count {
        bail!("Only {count} pinned actions");
    }
    kernel.move_pin(from, to);
    cmd_pins(kernel, out)
}

/// Ticks the kernel until the diagnostics started at boot have reported.
pub async fn wait_for_diagnostics(kernel: &mut CliKernel) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Checking tools...");

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    while kernel.diagnostics_pending() {
        interval.tick().await;
        pb.suspend(|| kernel.tick());
    }

    pb.finish_and_clear();
    Ok(())
}

pub async fn cmd_preflight(kernel: &mut CliKernel) -> Result<()> {
    kernel.run_preflight();
    wait_for_diagnostics(kernel).await
}

pub async fn cmd_status(
    kernel: &mut CliKernel,
    json: bool,
    cached: bool,
    out: &mut impl Write,
) -> Result<()> {
    if !cached {
        wait_for_diagnostics(kernel).await?;
    }
    let Some(snapshot) = kernel.status() else {
        bail!("No saved status yet, run without --cached");
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(snapshot)?)?;
        return Ok(());
    }
    for (tool, status) in snapshot.iter() {
        writeln!(
            out,
            "{tool:<10} {:<7} {}",
            status.state.as_str(),
            status.version
        )?;
    }
    Ok(())
}

/// Runs one action in the foreground. Ctrl-C stops it.
///
/// Returns the exit code, `None` when the process was killed.
pub async fn cmd_run(kernel: &mut CliKernel, id: &str) -> Result<Option<i32>> {
    if !kernel.run_action(id) {
        bail!("Could not start '{id}'");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let mut stopping = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                kernel.tick();
                if let Some(code) = kernel.notifier_mut().take_exit() {
                    return Ok(code);
                }
            }
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                // stop() blocks while the process is reaped
                let stopped = tokio::task::block_in_place(|| kernel.stop_process());
                if !stopped && kernel.runner_state() == RunnerState::Running {
                    tracing::warn!("Process is still shutting down");
                }
            }
        }
    }
}
