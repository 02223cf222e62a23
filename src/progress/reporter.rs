// ! Incremental progress reporting
// !
// ! The workflow appends lines while it runs; a periodic flush swaps the
// ! pending lines out and hands them to the operator session as one batch.

use crate::progress::session::OperatorSession;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Append-only buffer of pending progress lines
///
/// Cloning yields another handle onto the same buffer.
#[derive(Debug, Default, Clone)]
pub struct ProgressReporter {
    pending: Arc<Mutex<Vec<String>>>,
    // Held across drain and send so concurrent flushes deliver in order
    delivery: Arc<Mutex<()>>,
    run_id: Option<String>,
}

impl ProgressReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reporter for the workflow run `run_id`
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            ..Self::default()
        }
    }

    /// Id of the workflow run this reporter belongs to, if any
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Queue one line for the next flush
    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        trace!(target: "soak_progress", "{}", line);
        self.lock().push(line);
    }

    /// Take every pending line, leaving the buffer empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Deliver pending lines to `session` as one batch
    ///
    /// # Returns
    /// `true` if a batch was delivered, `false` if nothing was pending
    pub fn flush_to(&self, session: &dyn OperatorSession) -> bool {
        let _delivery = self
            .delivery
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let batch = self.drain();
        if batch.is_empty() {
            return false;
        }
        session.send_messages(batch);
        true
    }

    /// Number of lines waiting for the next flush
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A poisoned buffer still holds valid lines
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
