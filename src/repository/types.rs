// ! Domain types produced by repository clients
// !
// ! Every value here is built fresh from a repository response and never
// ! mutated afterwards. Derived data (parsed versions, dates, links) is
// ! computed at construction time.

use crate::core::error::{SoakError, SoakResult};
use crate::core::version::Version;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

/// Largest artifact accepted from an archive, in bytes
pub const MAX_ARTIFACT_SIZE: u64 = 512 * 1024 * 1024;

/// One dependency edge: a plugin id plus the minimum acceptable version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionReference {
    /// Plugin identifier
    pub plugin_id: String,

    /// Required version
    pub version: Version,
}

impl VersionReference {
    /// Create a reference, parsing the version string
    pub fn new(plugin_id: impl Into<String>, version: &str) -> SoakResult<Self> {
        Ok(Self {
            plugin_id: plugin_id.into(),
            version: Version::parse(version)?,
        })
    }
}

impl fmt::Display for VersionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.plugin_id, self.version)
    }
}

/// One resolvable, installable plugin version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Plugin identifier
    pub plugin_id: String,

    /// Version of this release
    pub version: Version,

    /// When the version was published
    pub release_date: DateTime<Utc>,

    /// Size of the downloadable file in bytes
    pub file_size: u64,

    /// Dependencies, in the order the repository listed them
    pub dependencies: Vec<VersionReference>,
}

/// Catalog metadata for a plugin, as returned by search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    /// Plugin identifier
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Short description
    pub description: String,

    /// Canonical project page
    pub web_link: String,

    /// Owner first, then the other project members
    pub authors: Vec<String>,

    /// When the project was created
    pub creation_date: DateTime<Utc>,

    /// Version the project recommends, as published
    pub recommended_version: String,
}

/// The installable payload of one plugin version
///
/// Holds the file name and contents of the first entry of the downloaded
/// archive. The archive itself is discarded once this value exists.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    filename: String,
    bytes: Vec<u8>,
}

impl DownloadedArtifact {
    /// Create an artifact from a file name and its contents
    ///
    /// Only the final path component of `filename` is kept, so an artifact
    /// can never be written outside the directory it is installed into.
    pub fn new(filename: &str, bytes: Vec<u8>) -> SoakResult<Self> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SoakError::archive(format!("artifact entry '{filename}' has no file name"))
            })?;

        Ok(Self {
            filename: name.to_string(),
            bytes,
        })
    }

    /// Build an artifact from the first entry of a zip archive
    ///
    /// Any further entries are ignored. An archive with no entries is an
    /// error rather than an artifact without a name, and so is an entry
    /// larger than [`MAX_ARTIFACT_SIZE`], whatever size its header claims.
    #[cfg(feature = "http")]
    pub fn from_zip(archive: &[u8]) -> SoakResult<Self> {
        use std::io::{Cursor, Read};

        let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;
        if archive.len() == 0 {
            return Err(SoakError::archive("downloaded archive contains no entries"));
        }

        let mut entry = archive.by_index(0)?;
        if entry.is_dir() {
            return Err(SoakError::archive(format!(
                "first archive entry '{}' is a directory",
                entry.name()
            )));
        }

        if entry.size() > MAX_ARTIFACT_SIZE {
            return Err(SoakError::archive(format!(
                "archive entry '{}' claims {} bytes, limit is {}",
                entry.name(),
                entry.size(),
                MAX_ARTIFACT_SIZE
            )));
        }

        let name = entry.name().to_string();
        // The declared size is untrusted; the buffer grows with what is actually read
        let mut bytes = Vec::new();
        (&mut entry)
            .take(MAX_ARTIFACT_SIZE + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_ARTIFACT_SIZE {
            return Err(SoakError::archive(format!(
                "archive entry '{name}' exceeds {MAX_ARTIFACT_SIZE} bytes"
            )));
        }
        Self::new(&name, bytes)
    }

    /// File name the artifact is installed under
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Size of the artifact in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the artifact has no content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the artifact contents
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for DownloadedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedArtifact")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}
