//! Installed-plugin oracle
//!
//! The installer never owns the host's plugin list; it asks an
//! [`InstalledPluginOracle`] whether a plugin is present and which version it
//! reports. [`PluginRegistry`] is the in-memory implementation, optionally
//! populated from a YAML manifest describing the host.

pub mod registry;
pub mod types;

pub use registry::PluginRegistry;
pub use types::{InstalledPlugin, InstalledPluginOracle};
