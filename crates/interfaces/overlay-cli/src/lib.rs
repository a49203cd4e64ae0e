pub mod commands;
pub mod console;

use anyhow::Result;
use camino::Utf8PathBuf;
use overlay_app_core::{default_profile_dir, AppKernel, FilePersistence, ProfileCatalog};
use overlay_infra::{DiagnosticsProbe, ProbeEnv};

pub use console::ConsoleNotifier;

pub type CliKernel = AppKernel<FilePersistence, FilePersistence, FilePersistence, ConsoleNotifier>;

/// Where the CLI reads profiles from and keeps its state.
#[derive(Debug, Clone, Default)]
pub struct CliPaths {
    pub profiles: Option<Utf8PathBuf>,
    pub state_dir: Option<Utf8PathBuf>,
}

/// Builds and boots a kernel over the on-disk state.
pub fn open_kernel(paths: &CliPaths, notifier: ConsoleNotifier) -> Result<CliKernel> {
    let profile_dir = match &paths.profiles {
        Some(dir) => dir.clone(),
        None => default_profile_dir()?,
    };
    tracing::debug!("Profiles from {profile_dir}");

    let store = match &paths.state_dir {
        Some(dir) => FilePersistence::at(dir.as_std_path()),
        None => FilePersistence::from_env(),
    };

    let mut kernel = AppKernel::new(
        ProfileCatalog::builtin(&profile_dir),
        store.clone(),
        store.clone(),
        store,
        DiagnosticsProbe::new(ProbeEnv::from_process()),
        notifier,
    )?;
    kernel.boot();
    Ok(kernel)
}
