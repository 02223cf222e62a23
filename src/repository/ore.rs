// ! Ore repository client
// !
// ! Module implements [`RepositoryClient`] against the Ore v1 HTTP API:
// !
// ! - `GET {api}/projects/{id}/versions` – array, first element is the latest
// ! - `GET {api}/projects?q={query}` – array of projects
// ! - `GET {api}/projects/{id}` – single project, used for its page link
// ! - `GET {link}/versions/download/{version}` – zip whose first entry is the jar

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RepositoryConfig;
use crate::core::error::{SoakError, SoakResult};
use crate::core::logging::{ErrorContext, ErrorLogger};
use crate::repository::wire::{OreProject, OreVersion};
use crate::repository::{
    DownloadedArtifact, PluginSummary, RepositoryClient, VersionInfo,
};

/// HTTP client for an Ore plugin repository
#[derive(Debug, Clone)]
pub struct OreRepository {
    client: Client,
    root: Url,
    api_base: Url,
}

impl OreRepository {
    /// Client for the default Ore instance
    pub fn new() -> SoakResult<Self> {
        Self::with_config(&RepositoryConfig::default())
    }

    /// Client with custom configuration
    ///
    /// # Arguments
    /// * `config` - Repository location, timeouts, user agent and headers
    pub fn with_config(config: &RepositoryConfig) -> SoakResult<Self> {
        let root = config.root()?;
        let api_base = config.api_base()?;

        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        for (key, value) in &config.headers {
            match (
                key.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Ignoring invalid repository header '{}'", key),
            }
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()
            .map_err(|e| SoakError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            root,
            api_base,
        })
    }

    /// API URL for the given path segments (each segment is percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> SoakResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SoakError::Url(format!("{} cannot be a base", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document; `None` when the server answers 404
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> SoakResult<Option<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("{} answered 404", url);
                Ok(None)
            }
            status if status.is_success() => {
                let body = response.bytes().await?;
                Ok(Some(serde_json::from_slice(&body)?))
            }
            status => Err(SoakError::Http(format!("GET {url} failed with status {status}"))),
        }
    }

    async fn fetch_project(&self, plugin_id: &str) -> SoakResult<Option<OreProject>> {
        self.get_json(self.endpoint(&["projects", plugin_id])?).await
    }
}

#[async_trait]
impl RepositoryClient for OreRepository {
    async fn fetch_latest_version_info(&self, plugin_id: &str) -> SoakResult<Option<VersionInfo>> {
        let url = self.endpoint(&["projects", plugin_id, "versions"])?;
        let versions: Option<Vec<OreVersion>> = self.get_json(url).await?;

        match versions.and_then(|versions| versions.into_iter().next()) {
            Some(latest) => Ok(Some(VersionInfo::try_from(latest)?)),
            None => {
                debug!("No published versions for {}", plugin_id);
                Ok(None)
            }
        }
    }

    async fn search(&self, query: &str) -> SoakResult<Vec<PluginSummary>> {
        let mut url = self.endpoint(&["projects"])?;
        url.query_pairs_mut().append_pair("q", query);

        // A missing collection endpoint reads as an empty collection
        let projects: Vec<OreProject> = self.get_json(url).await?.unwrap_or_default();

        // One malformed project does not hide the rest of the results
        let summaries = projects
            .into_iter()
            .filter_map(|project| {
                let plugin_id = project.plugin_id.clone();
                match project.into_summary(self.root.as_str()) {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        ErrorLogger::log_error(
                            &e,
                            ErrorContext::new("search")
                                .with_plugin(plugin_id)
                                .with_component("ore_repository")
                                .with_extra("query", query),
                        );
                        None
                    }
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn fetch_artifact(&self, version: &VersionInfo) -> SoakResult<Option<DownloadedArtifact>> {
        let Some(project) = self.fetch_project(&version.plugin_id).await? else {
            return Ok(None);
        };

        let download = format!(
            "{}/versions/download/{}",
            project.web_link(self.root.as_str()),
            version.version
        );
        let download = Url::parse(&download)?;
        info!("Downloading {} {} from {}", version.plugin_id, version.version, download);

        let response = self.client.get(download.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(SoakError::Http(format!(
                    "download {download} failed with status {status}"
                )));
            }
            _ => {}
        }

        let archive = response.bytes().await?;
        let artifact = tokio::task::spawn_blocking(move || DownloadedArtifact::from_zip(&archive))
            .await
            .map_err(|e| SoakError::internal(format!("archive task failed: {e}")))??;

        debug!(
            "Extracted {} ({} bytes) for {}",
            artifact.filename(),
            artifact.len(),
            version.plugin_id
        );
        Ok(Some(artifact))
    }

    fn describe(&self) -> String {
        format!("Ore repository at {}", self.api_base)
    }
}
