// ! Top-level workflow bodies
// !
// ! One function per command. Each reports to the progress reporter and
// ! never fails as a whole: per-plugin failures become report lines.

use crate::core::logging::ErrorLogger;
use crate::plugin::types::InstalledPluginOracle;
use crate::progress::reporter::ProgressReporter;
use crate::repository::{PluginSummary, RepositoryClient, VersionInfo};
use crate::workflow::installer::Installer;
use crate::workflow::run_context;
use tracing::{debug, info};

/// Install the latest version of each requested plugin
pub async fn install(
    installer: &Installer,
    repository: &dyn RepositoryClient,
    plugin_ids: &[String],
    reporter: &ProgressReporter,
) {
    reporter.append(format!(
        "attempting installation of the plugins {}",
        plugin_ids.join(", ")
    ));

    for plugin_id in plugin_ids {
        if let Some(version) = latest_version(repository, plugin_id, reporter).await {
            install_one(installer, &version, reporter).await;
        }
    }
}

/// Reinstall every installed, non-virtual plugin at its latest version
pub async fn update(
    installer: &Installer,
    repository: &dyn RepositoryClient,
    oracle: &dyn InstalledPluginOracle,
    reporter: &ProgressReporter,
) {
    let installed: Vec<_> = oracle
        .list_installed()
        .into_iter()
        .filter(|plugin| !plugin.is_virtual)
        .collect();
    debug!("Checking {} installed plugins for updates", installed.len());

    for plugin in installed {
        reporter.append(format!(
            "querying latest version of {} (current={})",
            plugin.name,
            plugin.version.as_deref().unwrap_or("unknown")
        ));

        match repository.fetch_latest_version_info(&plugin.id).await {
            Ok(Some(version)) => install_one(installer, &version, reporter).await,
            Ok(None) => reporter.append("not found in the plugin repository"),
            Err(e) => {
                ErrorLogger::log_error(
                    &e,
                    run_context("update", reporter).with_plugin(plugin.id.as_str()),
                );
                reporter.append(format!(
                    "could not query repository for {}: {}",
                    plugin.id, e
                ));
            }
        }
    }
}

/// Accept a removal request; removal itself is not performed
pub fn remove(plugin_ids: &[String], _reporter: &ProgressReporter) {
    info!(
        "Removal requested for {}; removing plugins is not supported",
        plugin_ids.join(", ")
    );
}

/// Search the repository and render each match
pub async fn search(repository: &dyn RepositoryClient, query: &str, reporter: &ProgressReporter) {
    match repository.search(query).await {
        Ok(results) if results.is_empty() => {
            reporter.append(format!("no plugins found for query '{query}'"));
        }
        Ok(results) => {
            reporter.append(format!(
                "the following plugins were found for the query '{query}':"
            ));
            for summary in &results {
                render_summary(summary, reporter);
            }
        }
        Err(e) => {
            ErrorLogger::log_error(
                &e,
                run_context("search", reporter).with_extra("query", query),
            );
            reporter.append(format!("search for '{query}' failed: {e}"));
        }
    }
}

fn render_summary(summary: &PluginSummary, reporter: &ProgressReporter) {
    reporter.append(format!("{} (id={})", summary.name, summary.id));
    reporter.append(format!("  version: {}", summary.recommended_version));
    reporter.append(format!("  description: {}", summary.description));
    reporter.append(format!("  link: {}", summary.web_link));
}

async fn latest_version(
    repository: &dyn RepositoryClient,
    plugin_id: &str,
    reporter: &ProgressReporter,
) -> Option<VersionInfo> {
    match repository.fetch_latest_version_info(plugin_id).await {
        Ok(Some(version)) => Some(version),
        Ok(None) => {
            reporter.append(format!("plugin id '{plugin_id}' not found, skipping"));
            None
        }
        Err(e) => {
            ErrorLogger::log_error(
                &e,
                run_context("install", reporter).with_plugin(plugin_id),
            );
            reporter.append(format!("could not query repository for {plugin_id}: {e}"));
            None
        }
    }
}

async fn install_one(installer: &Installer, version: &VersionInfo, reporter: &ProgressReporter) {
    if let Err(e) = installer.install_version(version, reporter).await {
        ErrorLogger::log_error(
            &e,
            run_context("install_version", reporter)
                .with_plugin(version.plugin_id.as_str())
                .with_extra("version", version.version.to_string()),
        );
        reporter.append(format!("failed to install {}: {}", version.plugin_id, e));
    }
}
