// ! Configuration for soak
// !
// ! Module handles the YAML configuration file that tells soak where the
// ! plugin repository lives and where installed artifacts land.

use crate::core::error::{SoakError, SoakResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Name of the configuration file looked up in the user config directory
pub const CONFIG_FILE_NAME: &str = "soak.yaml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoakConfig {
    /// Remote repository settings
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Directory installed artifacts are written to
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// Interval between progress flushes in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// YAML manifest describing the plugins already installed on the host
    #[serde(default)]
    pub installed_manifest: Option<PathBuf>,
}

/// Remote repository configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Site root, used to resolve project links
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// API path relative to the root
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("mods")
}

fn default_flush_interval_ms() -> u64 {
    50
}

fn default_root_url() -> String {
    "https://ore.spongepowered.org/".to_string()
}

fn default_api_path() -> String {
    "api/v1/".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

fn default_read_timeout_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    concat!("soak/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            api_path: default_api_path(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl RepositoryConfig {
    /// Repository rooted at `root_url` with default settings otherwise
    pub fn with_root(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            ..Default::default()
        }
    }

    /// Site root as a URL, always ending in `/`
    pub fn root(&self) -> SoakResult<Url> {
        let mut root = self.root_url.trim().to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        Ok(Url::parse(&root)?)
    }

    /// API base URL, always ending in `/`
    pub fn api_base(&self) -> SoakResult<Url> {
        let mut path = self.api_path.trim().trim_start_matches('/').to_string();
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        Ok(self.root()?.join(&path)?)
    }

    /// Connection timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig::default(),
            plugin_dir: default_plugin_dir(),
            flush_interval_ms: default_flush_interval_ms(),
            installed_manifest: None,
        }
    }
}

impl SoakConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml_str(content: &str) -> SoakResult<Self> {
        let config: SoakConfig = serde_yaml::from_str(content)
            .map_err(|e| SoakError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> SoakResult<Self> {
        debug!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| {
            SoakError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load `path` if given, else the user config file if it exists, else defaults
    pub fn discover(path: Option<&Path>) -> SoakResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/soak/soak.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("soak").join(CONFIG_FILE_NAME))
    }

    /// Check the configuration for values soak cannot work with
    pub fn validate(&self) -> SoakResult<()> {
        self.repository
            .api_base()
            .map_err(|e| SoakError::config(format!("repository url: {e}")))?;
        if self.flush_interval_ms == 0 {
            return Err(SoakError::config("flush_interval_ms must be positive"));
        }
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(SoakError::config("plugin_dir must not be empty"));
        }
        Ok(())
    }

    /// Interval between progress flushes
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
