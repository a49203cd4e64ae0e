mod async_runtime;
pub mod diagnostics;
pub mod domain;
pub mod events;
pub mod kernel;
pub mod persistence;
pub mod pins;
pub mod ports;
pub mod registry;

pub use domain::{AppSettings, ProfileCatalog, StatusSnapshotFile};
pub use events::{CoreEvent, RefreshId, ReleaseHandle};
pub use kernel::AppKernel;
pub use persistence::{default_profile_dir, FilePersistence};
pub use pins::PinStore;
pub use ports::*;
pub use registry::ActionRegistry;
