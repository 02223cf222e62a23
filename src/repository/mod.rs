//! Remote plugin repository access
//!
//! [`RepositoryClient`] is the seam between the installer and whatever
//! serves plugin metadata and artifacts. [`OreRepository`] talks to an Ore
//! instance over HTTP; tests substitute their own implementation.

#[cfg(feature = "http")]
pub mod ore;
pub mod types;
pub mod wire;

#[cfg(feature = "http")]
pub use ore::OreRepository;
pub use types::{DownloadedArtifact, PluginSummary, VersionInfo, VersionReference};

use crate::core::error::SoakResult;
use async_trait::async_trait;

/// Client for a remote plugin repository
///
/// "Not found" answers are `Ok(None)` (or an empty list for search), never
/// an error. Errors mean the repository could not be asked or its answer
/// could not be understood.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetch the latest published version of a plugin
    ///
    /// # Arguments
    /// * `plugin_id` - Plugin identifier
    ///
    /// # Returns
    /// The newest [`VersionInfo`], or `None` when the repository has no such plugin
    async fn fetch_latest_version_info(&self, plugin_id: &str) -> SoakResult<Option<VersionInfo>>;

    /// Search the repository catalog
    ///
    /// # Returns
    /// Matching plugins; empty when nothing matched
    async fn search(&self, query: &str) -> SoakResult<Vec<PluginSummary>>;

    /// Download the installable artifact for a plugin version
    ///
    /// # Returns
    /// The artifact, or `None` when the plugin's project cannot be found
    async fn fetch_artifact(&self, version: &VersionInfo) -> SoakResult<Option<DownloadedArtifact>>;

    /// Describe the repository for logs
    fn describe(&self) -> String {
        "unknown repository".to_string()
    }
}
