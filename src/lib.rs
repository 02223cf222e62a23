// Copyright (c) 2025 Soak Contributors
// SPDX-License-Identifier: MIT

//! # Soak
//!
//! Installs game-server plugins from a remote plugin repository (Ore), pulling
//! in their dependencies first and streaming human-readable progress back to
//! whoever asked.
// !
//! ## Features
//!
//! - **Dependency resolution**: depth-first, with installed plugins consulted
//!   before the network and cycles reported instead of followed
//! - **Swappable backends**: the repository and the installed-plugin list sit
//!   behind traits, so tests and other hosts can supply their own
//! - **Incremental progress**: lines are batched and flushed on a short tick
//!   while the workflow runs, then drained once more when it finishes
//! - **Ore over HTTP**: `reqwest` client with configurable timeouts and headers
// !
//! ## Quick Start
//!
//! ```rust,no_run
//! use soak::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> SoakResult<()> {
//! let config = SoakConfig::discover(None)?;
//! let workflow = Workflow::new(
//!     Arc::new(OreRepository::with_config(&config.repository)?),
//!     Arc::new(PluginRegistry::new()),
//!     Arc::new(TokioTaskRunner::current()?),
//!     config.plugin_dir.clone(),
//! )
//! .with_flush_interval(config.flush_interval());
//!
//! let command = Command::install(["nucleus"])?;
//! workflow.schedule(command, Arc::new(ConsoleSession))?.join().await
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`core`]: Errors, structured error logging and the version model
//! - [`config`]: YAML configuration
//! - [`repository`]: Repository client trait, domain types and the Ore backend
//! - [`plugin`]: Installed-plugin oracle and its in-memory registry
//! - [`progress`]: Progress reporter and operator sessions
//! - [`runtime`]: Task runner abstraction over tokio
//! - [`workflow`]: Commands, the dependency installer and workflow scheduling

pub mod config;
pub mod core;
pub mod plugin;
pub mod progress;
pub mod repository;
pub mod runtime;
pub mod workflow;

// Re-export commonly used types for convenience
pub use core::error::{SoakError, SoakResult};
pub use core::version::Version;

/// Prelude module for convenient imports
///
/// Use `use soak::prelude::*;` to import everything needed to run a workflow.
pub mod prelude {
    // Core types
    pub use crate::config::{RepositoryConfig, SoakConfig};
    pub use crate::core::{
        error::{SoakError, SoakResult},
        logging::{ErrorContext, ErrorLogger},
        version::Version,
    };

    // Repository access
    #[cfg(feature = "http")]
    pub use crate::repository::OreRepository;
    pub use crate::repository::{
        DownloadedArtifact, PluginSummary, RepositoryClient, VersionInfo, VersionReference,
    };

    // Installed plugins
    pub use crate::plugin::{InstalledPlugin, InstalledPluginOracle, PluginRegistry};

    // Progress and scheduling
    pub use crate::progress::{ConsoleSession, OperatorSession, ProgressReporter, RecordingSession};
    pub use crate::runtime::{PeriodicHandle, TaskHandle, TaskRunner, TokioTaskRunner};
    pub use crate::workflow::{Command, Workflow};

    // Essential external types
    pub use async_trait::async_trait;
}
