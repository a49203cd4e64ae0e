pub mod launcher;
pub mod probe;

// Re-exports for convenience
pub use launcher::{LaunchError, ProcessRunner, RunnerEvent, RunnerState};
pub use probe::{DiagnosticsProbe, ProbeEnv, VersionCheck};
