//! Core abstractions and types for soak
//!
//! This module contains the fundamental building blocks shared by every
//! other module: error handling, structured logging and the version model.

pub mod error;
pub mod logging;
pub mod version;

// Re-export commonly used items
pub use error::{SoakError, SoakResult};
pub use logging::{ErrorContext, ErrorLogLevel, ErrorLogger};
pub use version::Version;
