//! Plugin workflows
//!
//! A [`Workflow`] turns a validated [`Command`] into a background task that
//! talks to the repository, installs artifacts and streams progress lines to
//! the operator session.
//!
//! # Example
//!
//! ```rust,no_run
//! use soak::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> SoakResult<()> {
//! let workflow = Workflow::new(
//!     Arc::new(OreRepository::new()?),
//!     Arc::new(PluginRegistry::new()),
//!     Arc::new(TokioTaskRunner::current()?),
//!     "mods",
//! );
//! let handle = workflow.schedule(Command::search("nucleus")?, Arc::new(ConsoleSession))?;
//! handle.join().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod installer;
pub mod tasks;

pub use command::{Command, MIN_QUERY_LENGTH};
pub use installer::{InstallLocks, Installer};

use crate::core::error::SoakResult;
use crate::core::logging::{ErrorContext, ErrorLogger};
use crate::plugin::types::InstalledPluginOracle;
use crate::progress::reporter::ProgressReporter;
use crate::progress::session::OperatorSession;
use crate::repository::RepositoryClient;
use crate::runtime::{TaskHandle, TaskRunner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug};
use uuid::Uuid;

/// Default interval between progress flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Shortest accepted interval between progress flushes
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Schedules commands against one repository, oracle and plugin directory
///
/// Clones share the install locks, so concurrent installs of the same plugin
/// id through any clone never interleave their writes.
#[derive(Clone)]
pub struct Workflow {
    repository: Arc<dyn RepositoryClient>,
    oracle: Arc<dyn InstalledPluginOracle>,
    runner: Arc<dyn TaskRunner>,
    installer: Arc<Installer>,
    flush_interval: Duration,
}

impl Workflow {
    /// Create a workflow installing into `plugin_dir`
    pub fn new(
        repository: Arc<dyn RepositoryClient>,
        oracle: Arc<dyn InstalledPluginOracle>,
        runner: Arc<dyn TaskRunner>,
        plugin_dir: impl Into<PathBuf>,
    ) -> Self {
        let installer = Installer::new(repository.clone(), oracle.clone(), plugin_dir);
        Self {
            repository,
            oracle,
            runner,
            installer: Arc::new(installer),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Set the interval between progress flushes
    ///
    /// Intervals shorter than [`MIN_FLUSH_INTERVAL`], zero included, are
    /// raised to it.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        if flush_interval < MIN_FLUSH_INTERVAL {
            debug!(
                "Flush interval {:?} raised to {:?}",
                flush_interval, MIN_FLUSH_INTERVAL
            );
        }
        self.flush_interval = flush_interval.max(MIN_FLUSH_INTERVAL);
        self
    }

    /// Interval between progress flushes
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Validate `command` and run it in the background
    ///
    /// Progress lines reach `session` in batches every flush interval, with
    /// one last flush after the command finishes.
    ///
    /// # Errors
    /// Returns a validation error, without scheduling anything, when the
    /// command's preconditions fail.
    pub fn schedule(
        &self,
        command: Command,
        session: Arc<dyn OperatorSession>,
    ) -> SoakResult<TaskHandle> {
        command.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let span = ErrorLogger::create_workflow_span(command.name(), &run_id);
        debug!("Scheduling {} as run {}", command, run_id);

        let workflow = self.clone();
        let body = async move {
            let reporter = ProgressReporter::for_run(run_id);
            let flusher = {
                let reporter = reporter.clone();
                let session = session.clone();
                Box::new(move || {
                    reporter.flush_to(session.as_ref());
                })
            };
            let periodic = workflow
                .runner
                .run_periodic(workflow.flush_interval, flusher);

            workflow.execute(&command, &reporter).await;

            periodic.stop().await;
            reporter.flush_to(session.as_ref());
            debug!("Workflow finished");
        };

        Ok(self.runner.run_async(Box::pin(body.instrument(span))))
    }

    /// Run `command` to completion on the current task
    ///
    /// Lines are appended to `reporter`; nothing is flushed.
    pub async fn execute(&self, command: &Command, reporter: &ProgressReporter) {
        match command {
            Command::Install { plugin_ids } => {
                tasks::install(&self.installer, self.repository.as_ref(), plugin_ids, reporter)
                    .await
            }
            Command::Update => {
                tasks::update(
                    &self.installer,
                    self.repository.as_ref(),
                    self.oracle.as_ref(),
                    reporter,
                )
                .await
            }
            Command::Remove { plugin_ids } => tasks::remove(plugin_ids, reporter),
            Command::Search { query } => {
                tasks::search(self.repository.as_ref(), query, reporter).await
            }
        }
    }
}

/// Error context for `operation`, tagged with the reporter's run id
pub(crate) fn run_context(operation: &str, reporter: &ProgressReporter) -> ErrorContext {
    let context = ErrorContext::new(operation);
    match reporter.run_id() {
        Some(run_id) => context.with_run_id(run_id),
        None => context,
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("repository", &self.repository.describe())
            .field("plugin_dir", &self.installer.plugin_dir())
            .field("flush_interval", &self.flush_interval)
            .finish()
    }
}
