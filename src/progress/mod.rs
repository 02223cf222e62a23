//! Progress reporting to the operator
//!
//! Long installs stream human-readable lines back to whoever issued the
//! command instead of answering with one blob at the end.

pub mod reporter;
pub mod session;

pub use reporter::ProgressReporter;
pub use session::{ConsoleSession, OperatorSession, RecordingSession};
