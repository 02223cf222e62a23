// ! In-memory registry of installed plugins
// !
// ! Module maintains the set of plugins present on the host and answers the
// ! installer's "is X installed, and at what version" questions.

use crate::core::error::{SoakError, SoakResult};
use crate::plugin::types::{InstalledPlugin, InstalledPluginOracle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Registry of installed plugins keyed by id
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, InstalledPlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `plugins`
    pub fn from_plugins(plugins: impl IntoIterator<Item = InstalledPlugin>) -> Self {
        let registry = Self::new();
        for plugin in plugins {
            registry.register(plugin);
        }
        registry
    }

    /// Parse a YAML manifest (a list of installed plugin entries)
    pub fn from_yaml_str(content: &str) -> SoakResult<Self> {
        let plugins: Vec<InstalledPlugin> = serde_yaml::from_str(content)
            .map_err(|e| SoakError::config(format!("invalid installed-plugin manifest: {e}")))?;
        Ok(Self::from_plugins(plugins))
    }

    /// Load a YAML manifest; a missing file yields an empty registry
    pub async fn load(path: &Path) -> SoakResult<Self> {
        if !tokio::fs::try_exists(path).await? {
            warn!("Installed-plugin manifest {:?} does not exist", path);
            return Ok(Self::new());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let registry = Self::from_yaml_str(&content)?;
        info!("Loaded {} installed plugins from {:?}", registry.len(), path);
        Ok(registry)
    }

    /// Register (or replace) a plugin
    pub fn register(&self, plugin: InstalledPlugin) {
        debug!("Registering installed plugin: {}", plugin.id);
        self.write().insert(plugin.id.clone(), plugin);
    }

    /// Remove a plugin, returning it if it was present
    pub fn unregister(&self, plugin_id: &str) -> Option<InstalledPlugin> {
        debug!("Unregistering installed plugin: {}", plugin_id);
        self.write().remove(plugin_id)
    }

    /// Number of registered entries, virtual ones included
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, InstalledPlugin>> {
        self.plugins.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, InstalledPlugin>> {
        self.plugins.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InstalledPluginOracle for PluginRegistry {
    fn list_installed(&self) -> Vec<InstalledPlugin> {
        let mut plugins: Vec<InstalledPlugin> = self
            .read()
            .values()
            .filter(|plugin| !plugin.is_virtual)
            .cloned()
            .collect();
        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        plugins
    }

    fn lookup(&self, plugin_id: &str) -> Option<InstalledPlugin> {
        self.read().get(plugin_id).cloned()
    }
}
