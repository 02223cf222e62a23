// ! Depth-first dependency resolution and artifact installation
// !
// ! Each node reports what it does to the progress reporter. Dependencies
// ! are resolved before the node itself is installed; a failed dependency is
// ! reported and does not stop its siblings or its parent.

use crate::core::error::{SoakError, SoakResult};
use crate::core::logging::ErrorLogger;
use crate::plugin::types::InstalledPluginOracle;
use crate::progress::reporter::ProgressReporter;
use crate::repository::{RepositoryClient, VersionInfo, VersionReference};
use crate::workflow::run_context;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Per-plugin-id locks serializing artifact writes
#[derive(Debug, Default, Clone)]
pub struct InstallLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl InstallLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive install rights on `plugin_id`
    pub async fn acquire(&self, plugin_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(plugin_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Resolves a version's dependency tree and writes artifacts to the plugin directory
pub struct Installer {
    repository: Arc<dyn RepositoryClient>,
    oracle: Arc<dyn InstalledPluginOracle>,
    plugin_dir: PathBuf,
    locks: InstallLocks,
}

impl Installer {
    /// Create an installer writing into `plugin_dir`
    pub fn new(
        repository: Arc<dyn RepositoryClient>,
        oracle: Arc<dyn InstalledPluginOracle>,
        plugin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            oracle,
            plugin_dir: plugin_dir.into(),
            locks: InstallLocks::new(),
        }
    }

    /// Directory artifacts are written to
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Install `version` after resolving its dependencies
    ///
    /// # Returns
    /// The path the artifact was written to. An error means `version` itself
    /// was not installed; dependency failures are only reported.
    pub async fn install_version(
        &self,
        version: &VersionInfo,
        reporter: &ProgressReporter,
    ) -> SoakResult<PathBuf> {
        let mut path = Vec::new();
        self.install_node(version, reporter, &mut path).await
    }

    // Boxed: recurses through install_remote_dependency
    fn install_node<'a>(
        &'a self,
        version: &'a VersionInfo,
        reporter: &'a ProgressReporter,
        path: &'a mut Vec<String>,
    ) -> BoxFuture<'a, SoakResult<PathBuf>> {
        Box::pin(async move {
            reporter.append(format!(
                "preparing installation of {} version {}",
                version.plugin_id, version.version
            ));

            path.push(version.plugin_id.clone());
            self.resolve_dependencies(version, reporter, path).await;
            path.pop();

            self.install_artifact(version, reporter).await
        })
    }

    async fn resolve_dependencies(
        &self,
        version: &VersionInfo,
        reporter: &ProgressReporter,
        path: &mut Vec<String>,
    ) {
        for dependency in &version.dependencies {
            reporter.append(format!("{} depends on {}", version.plugin_id, dependency));

            if let Some(installed) = self.oracle.lookup(&dependency.plugin_id) {
                let current = match installed.parsed_version() {
                    Ok(current) => current,
                    Err(e) => {
                        ErrorLogger::log_error(
                            &e,
                            run_context("parse_installed_version", reporter)
                                .with_plugin(installed.id.as_str())
                                .with_component("installer"),
                        );
                        reporter.append(format!(
                            "cannot compare versions for {}: {}",
                            dependency.plugin_id, e
                        ));
                        continue;
                    }
                };
                match current {
                    Some(current) if dependency.version > current => {
                        reporter.append(format!(
                            "{} requires update from {} to {}",
                            installed.name, current, dependency.version
                        ));
                    }
                    Some(_) => reporter.append("dependency satisfied"),
                    None => reporter.append(format!(
                        "version unknown for plugin {}, assuming compatible",
                        installed.name
                    )),
                }
                continue;
            }

            if path.iter().any(|id| id == &dependency.plugin_id) {
                reporter.append(format!(
                    "circular dependency on {}, skipping",
                    dependency.plugin_id
                ));
                continue;
            }

            reporter.append("dependency not found locally, searching remote");
            self.install_remote_dependency(dependency, reporter, path)
                .await;
        }
    }

    async fn install_remote_dependency(
        &self,
        dependency: &VersionReference,
        reporter: &ProgressReporter,
        path: &mut Vec<String>,
    ) {
        let info = match self
            .repository
            .fetch_latest_version_info(&dependency.plugin_id)
            .await
        {
            Ok(Some(info)) => info,
            Ok(None) => {
                reporter.append(format!("could not find dependency {}", dependency.plugin_id));
                return;
            }
            Err(e) => {
                ErrorLogger::log_error(
                    &e,
                    run_context("fetch_latest_version_info", reporter)
                        .with_plugin(dependency.plugin_id.as_str())
                        .with_component("installer"),
                );
                reporter.append(format!(
                    "failed to query remote for {}: {}",
                    dependency.plugin_id, e
                ));
                return;
            }
        };

        if let Err(e) = self.install_node(&info, reporter, path).await {
            ErrorLogger::log_error(
                &e,
                run_context("install_dependency", reporter)
                    .with_plugin(info.plugin_id.as_str())
                    .with_component("installer"),
            );
            reporter.append(format!("failed to install {}: {}", info.plugin_id, e));
        }
    }

    async fn install_artifact(
        &self,
        version: &VersionInfo,
        reporter: &ProgressReporter,
    ) -> SoakResult<PathBuf> {
        reporter.append(format!("will now install {}", version.plugin_id));

        let _guard = self.locks.acquire(&version.plugin_id).await;

        let artifact = self
            .repository
            .fetch_artifact(version)
            .await?
            .ok_or_else(|| {
                SoakError::not_found(format!(
                    "no artifact for {}@{}",
                    version.plugin_id, version.version
                ))
            })?;

        tokio::fs::create_dir_all(&self.plugin_dir).await?;
        let destination = self.plugin_dir.join(artifact.filename());
        debug!("Writing {} bytes to {:?}", artifact.len(), destination);
        tokio::fs::write(&destination, artifact.into_bytes()).await?;

        info!(
            "Installed {}@{} to {:?}",
            version.plugin_id, version.version, destination
        );
        reporter.append("success");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::registry::PluginRegistry;
    use crate::plugin::types::InstalledPlugin;
    use crate::repository::{DownloadedArtifact, PluginSummary};
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[derive(Default)]
    struct StaticRepository {
        versions: HashMap<String, VersionInfo>,
    }

    impl StaticRepository {
        fn with(mut self, id: &str, version: &str, deps: &[(&str, &str)]) -> Self {
            let info = VersionInfo {
                plugin_id: id.to_string(),
                version: version.parse().unwrap(),
                release_date: Utc::now(),
                file_size: 3,
                dependencies: deps
                    .iter()
                    .map(|(dep, ver)| VersionReference::new(*dep, ver).unwrap())
                    .collect(),
            };
            self.versions.insert(id.to_string(), info);
            self
        }
    }

    #[async_trait]
    impl RepositoryClient for StaticRepository {
        async fn fetch_latest_version_info(
            &self,
            plugin_id: &str,
        ) -> SoakResult<Option<VersionInfo>> {
            Ok(self.versions.get(plugin_id).cloned())
        }

        async fn search(&self, _query: &str) -> SoakResult<Vec<PluginSummary>> {
            Ok(Vec::new())
        }

        async fn fetch_artifact(
            &self,
            version: &VersionInfo,
        ) -> SoakResult<Option<DownloadedArtifact>> {
            DownloadedArtifact::new(&format!("{}.jar", version.plugin_id), b"jar".to_vec())
                .map(Some)
        }
    }

    fn locked_ids(installer: &Installer) -> usize {
        installer.locks.locks.lock().unwrap().len()
    }

    fn installer(repo: StaticRepository, registry: PluginRegistry, dir: &Path) -> Installer {
        Installer::new(Arc::new(repo), Arc::new(registry), dir)
    }

    #[tokio::test]
    async fn test_installs_dependency_first() {
        let dir = TempDir::new().unwrap();
        let repo = StaticRepository::default()
            .with("a", "1.0", &[("b", "1.0")])
            .with("b", "1.0", &[]);
        let installer = installer(repo, PluginRegistry::new(), dir.path());
        let reporter = ProgressReporter::new();

        let info = installer
            .repository
            .fetch_latest_version_info("a")
            .await
            .unwrap()
            .unwrap();
        let written = installer.install_version(&info, &reporter).await.unwrap();

        assert_eq!(written, dir.path().join("a.jar"));
        assert!(dir.path().join("b.jar").exists());
        assert_eq!(locked_ids(&installer), 2);
        assert_eq!(
            reporter.drain(),
            vec![
                "preparing installation of a version 1.0",
                "a depends on b@1.0",
                "dependency not found locally, searching remote",
                "preparing installation of b version 1.0",
                "will now install b",
                "success",
                "will now install a",
                "success",
            ]
        );
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let repo = StaticRepository::default()
            .with("a", "1.0", &[("b", "1.0")])
            .with("b", "1.0", &[("a", "1.0")]);
        let installer = installer(repo, PluginRegistry::new(), dir.path());
        let reporter = ProgressReporter::new();

        let info = installer.repository.fetch_latest_version_info("a").await.unwrap().unwrap();
        installer.install_version(&info, &reporter).await.unwrap();

        let lines = reporter.drain();
        assert!(lines.contains(&"circular dependency on a, skipping".to_string()));
        assert_eq!(lines.iter().filter(|l| *l == "success").count(), 2);
    }

    #[tokio::test]
    async fn test_unparsable_installed_version_is_reported() {
        let dir = TempDir::new().unwrap();
        let repo = StaticRepository::default().with("a", "1.0", &[("b", "1.0")]);
        let registry =
            PluginRegistry::from_plugins([InstalledPlugin::new("b", "Bee", Some("not-a-version"))]);
        let installer = installer(repo, registry, dir.path());
        let reporter = ProgressReporter::new();

        let info = installer.repository.fetch_latest_version_info("a").await.unwrap().unwrap();
        installer.install_version(&info, &reporter).await.unwrap();

        let lines = reporter.drain();
        assert!(
            lines[2].starts_with("cannot compare versions for b: Invalid version:"),
            "{lines:?}"
        );
        assert_eq!(&lines[3..], &["will now install a", "success"]);
        assert!(!dir.path().join("b.jar").exists());
    }

    #[tokio::test]
    async fn test_locks_are_per_id() {
        let locks = InstallLocks::new();
        let first = locks.acquire("a").await;
        // A different id is not blocked
        let _other = locks.acquire("b").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.acquire("a").await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }
}
