// ! Installed-plugin types and the oracle trait

use crate::core::error::SoakResult;
use crate::core::version::Version;
use serde::{Deserialize, Serialize};

/// A plugin present on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    /// Plugin identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Version the plugin reports, if it reports one
    #[serde(default)]
    pub version: Option<String>,

    /// Host-internal entry with no real artifact behind it
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

impl InstalledPlugin {
    /// A regular installed plugin
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.map(str::to_string),
            is_virtual: false,
        }
    }

    /// A host-internal plugin entry
    pub fn virtual_entry(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            is_virtual: true,
        }
    }

    /// Parse the reported version
    ///
    /// # Returns
    /// `Ok(None)` when the plugin does not report a version, an
    /// `InvalidVersion` error when it reports one that cannot be parsed
    pub fn parsed_version(&self) -> SoakResult<Option<Version>> {
        self.version.as_deref().map(Version::parse).transpose()
    }
}

/// Read-only view of the host's plugin registry
pub trait InstalledPluginOracle: Send + Sync {
    /// All installed plugins, virtual entries excluded
    fn list_installed(&self) -> Vec<InstalledPlugin>;

    /// Look up one plugin by id (virtual entries included)
    fn lookup(&self, plugin_id: &str) -> Option<InstalledPlugin>;
}
