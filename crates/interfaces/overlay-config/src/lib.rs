//! Central configuration constants for runtime limits and defaults.

use std::time::Duration;

/// Mode selected when nothing (or something unknown) has been persisted.
pub const DEFAULT_MODE: &str = "default";

/// Built-in modes and the profile file each one reads, relative to the profile directory.
pub const BUILTIN_PROFILES: &[(&str, &str)] = &[
    (DEFAULT_MODE, "actions.yaml"),
    ("studio", "studio.yaml"),
    ("capture", "capture.yaml"),
];

/// Upper bound for a single `--version` style check.
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of characters kept from a version check's combined output.
pub const DIAGNOSTIC_TEXT_LIMIT: usize = 400;

/// How long `stop()` waits for a killed process to be reaped.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How long the runner keeps draining pipes after the child has exited.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Read buffer size for streamed process output.
pub const OUTPUT_CHUNK_SIZE: usize = 4096;

/// Capacity of the cross-thread event queues.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Characters of the response body printed by the webhook trigger.
pub const TRIGGER_BODY_PREVIEW: usize = 200;

/// Override for the Tesseract executable.
pub const TESSERACT_PATH_ENV: &str = "TESSERACT_PATH";

/// Override for the ffmpeg executable (the name imageio-ffmpeg exports).
pub const FFMPEG_PATH_ENV: &str = "IMAGEIO_FFMPEG_EXE";

/// Presence flag for a configured n8n webhook.
pub const N8N_WEBHOOK_ENV: &str = "N8N_WEBHOOK_PING";

/// Override for the directory holding settings, pins and the status snapshot.
pub const STATE_DIR_ENV: &str = "OVERLAY_STATE_DIR";

/// Override for the directory holding the profile files.
pub const PROFILE_DIR_ENV: &str = "OVERLAY_PROFILE_DIR";

/// Looks up the profile file name for a built-in mode.
pub fn profile_file(mode: &str) -> Option<&'static str> {
    BUILTIN_PROFILES
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, file)| *file)
}
