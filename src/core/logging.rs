// ! Structured logging for soak
// !
// ! Module provides structured error logging with categorization and
// ! context preservation. Operator-facing progress lines are a separate
// ! channel; everything here goes to `tracing`.

use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{Level, error, info, span, warn};

use crate::core::error::SoakError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLogLevel {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but the workflow can continue
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational error context
    Info,
}

impl From<&SoakError> for ErrorLogLevel {
    fn from(error: &SoakError) -> Self {
        match error {
            SoakError::Internal(_) => ErrorLogLevel::Critical,

            SoakError::Serialization(_)
            | SoakError::Archive(_)
            | SoakError::InvalidVersion(_)
            | SoakError::Config(_) => ErrorLogLevel::Error,

            SoakError::Transport(_) | SoakError::Io(_) => ErrorLogLevel::Warning,

            #[cfg(feature = "http")]
            SoakError::Http(_) => ErrorLogLevel::Warning,

            // Operator input and repository misses
            SoakError::Validation(_) | SoakError::NotFound(_) | SoakError::Url(_) => {
                ErrorLogLevel::Info
            }
        }
    }
}

/// Extended error context for logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation being performed when error occurred
    pub operation: String,
    /// Plugin the operation was working on
    pub plugin_id: Option<String>,
    /// Component identifier (repository, installer, registry, ...)
    pub component: Option<String>,
    /// Workflow run id
    pub run_id: Option<String>,
    /// Additional context data
    pub extra: HashMap<String, Value>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            operation: "unknown".to_string(),
            plugin_id: None,
            component: None,
            run_id: None,
            extra: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Set the plugin id
    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    /// Set component identifier
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the workflow run id
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Add extra context data
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Error logger mapping [`SoakError`] onto tracing levels
pub struct ErrorLogger;

impl ErrorLogger {
    /// Log an error with full context
    pub fn log_error(error: &SoakError, context: ErrorContext) {
        let category = error.category();
        let recoverable = error.is_recoverable();
        let log_level = ErrorLogLevel::from(error);

        let log_data = json!({
            "error_category": category,
            "error_recoverable": recoverable,
            "error_message": error.to_string(),
            "operation": context.operation,
            "plugin_id": context.plugin_id,
            "component": context.component,
            "run_id": context.run_id,
            "extra_context": context.extra,
        });
        let log_data = serde_json::to_string(&log_data).unwrap_or_default();

        match log_level {
            ErrorLogLevel::Critical => {
                error!(
                    target: "soak_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "CRITICAL soak error: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Error => {
                error!(
                    target: "soak_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "soak error: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Warning => {
                warn!(
                    target: "soak_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "soak warning: {} - {}",
                    error,
                    log_data
                );
            }
            ErrorLogLevel::Info => {
                info!(
                    target: "soak_errors",
                    error_category = category,
                    error_recoverable = recoverable,
                    operation = context.operation.as_str(),
                    "soak info: {} - {}",
                    error,
                    log_data
                );
            }
        }
    }

    /// Create a logging span for a workflow run
    pub fn create_workflow_span(task: &str, run_id: &str) -> tracing::Span {
        span!(Level::INFO, "soak_workflow", task = task, run_id = run_id)
    }
}

impl SoakError {
    /// Log this error with basic context
    pub fn log_error(&self, operation: &str) {
        ErrorLogger::log_error(self, ErrorContext::new(operation));
    }
}
