// ! Operator sessions
// !
// ! A session is whoever issued the command and receives its progress lines.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Receiver of progress line batches
pub trait OperatorSession: Send + Sync {
    /// Deliver one batch of lines, in order
    fn send_messages(&self, lines: Vec<String>);
}

/// Session printing each line to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSession;

impl OperatorSession for ConsoleSession {
    fn send_messages(&self, lines: Vec<String>) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in lines {
            // A closed stdout has no one left to tell
            if writeln!(out, "{line}").is_err() {
                return;
            }
        }
        let _ = out.flush();
    }
}

/// Session keeping every delivered batch in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSession {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingSession {
    /// Create an empty recording session
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches delivered so far
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All delivered lines, flattened in delivery order
    pub fn lines(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }

    /// Number of batches delivered so far
    pub fn batch_count(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl OperatorSession for RecordingSession {
    fn send_messages(&self, lines: Vec<String>) {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(lines);
    }
}
