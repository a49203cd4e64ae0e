pub mod profile;

pub use profile::{load_profile, parse_profile};
