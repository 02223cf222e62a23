// ! Ore repository wire format
// !
// ! Module holds the JSON shapes the Ore API speaks and converts them into
// ! the domain types in [`super::types`]. Conversion is eager: versions and
// ! timestamps are parsed once, here, and failures surface immediately.

use crate::core::error::{SoakError, SoakResult};
use crate::core::version::Version;
use crate::repository::types::{PluginSummary, VersionInfo, VersionReference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project object (`GET /projects/{id}`, elements of `GET /projects?q=`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OreProject {
    pub plugin_id: String,
    pub created_at: String,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub description: Option<String>,
    pub href: String,
    #[serde(default)]
    pub members: Vec<OreMember>,
    #[serde(default)]
    pub recommended: Option<OreChannelVersion>,
}

/// Project member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OreMember {
    pub name: String,
}

/// Recommended version pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OreChannelVersion {
    pub version: String,
}

/// Version object (elements of `GET /projects/{id}/versions`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OreVersion {
    pub created_at: String,
    /// The version string
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<OreDependency>,
    pub plugin_id: String,
    #[serde(default)]
    pub file_size: u64,
}

/// Dependency edge inside a version object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OreDependency {
    pub plugin_id: String,
    pub version: String,
}

fn parse_timestamp(value: &str) -> SoakResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

impl OreProject {
    /// Project page: the site root joined with `href` (one leading `/` dropped)
    pub fn web_link(&self, root: &str) -> String {
        let href = self.href.strip_prefix('/').unwrap_or(&self.href);
        if root.ends_with('/') {
            format!("{root}{href}")
        } else {
            format!("{root}/{href}")
        }
    }

    /// Convert into a [`PluginSummary`], resolving links against `root`
    pub fn into_summary(self, root: &str) -> SoakResult<PluginSummary> {
        let web_link = self.web_link(root);
        let creation_date = parse_timestamp(&self.created_at)?;
        let authors = std::iter::once(self.owner)
            .chain(self.members.into_iter().map(|member| member.name))
            .collect();

        Ok(PluginSummary {
            id: self.plugin_id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            web_link,
            authors,
            creation_date,
            recommended_version: self
                .recommended
                .map(|recommended| recommended.version)
                .unwrap_or_default(),
        })
    }
}

impl TryFrom<OreDependency> for VersionReference {
    type Error = SoakError;

    fn try_from(dep: OreDependency) -> Result<Self, Self::Error> {
        let version = Version::parse(&dep.version).map_err(|e| {
            SoakError::InvalidVersion(format!("dependency {}: {e}", dep.plugin_id))
        })?;
        Ok(VersionReference {
            plugin_id: dep.plugin_id,
            version,
        })
    }
}

impl TryFrom<OreVersion> for VersionInfo {
    type Error = SoakError;

    fn try_from(wire: OreVersion) -> Result<Self, Self::Error> {
        let version = Version::parse(&wire.name)
            .map_err(|e| SoakError::InvalidVersion(format!("{}: {e}", wire.plugin_id)))?;
        let release_date = parse_timestamp(&wire.created_at)?;
        let dependencies = wire
            .dependencies
            .into_iter()
            .map(VersionReference::try_from)
            .collect::<SoakResult<Vec<_>>>()?;

        Ok(VersionInfo {
            plugin_id: wire.plugin_id,
            version,
            release_date,
            file_size: wire.file_size,
            dependencies,
        })
    }
}
