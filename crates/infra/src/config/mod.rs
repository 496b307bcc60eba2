//! Configuration loading
//!
//! Reads [`bike_domain::Config`] from the environment or from a JSON/TOML
//! file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, load_from_lookup, probe_config_paths};
