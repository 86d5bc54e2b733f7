//! Recording audit sink for testing.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audit::{AccessLimitLogEntry, AuditSink};

/// Audit sink that keeps every entry in memory.
///
/// Clones share the recorded entries.
#[derive(Debug, Clone)]
pub struct RecordingAuditSink {
    entries: Arc<Mutex<Vec<AccessLimitLogEntry>>>,
    logging: bool,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            logging: true,
        }
    }

    /// A sink that still records but reports itself as not logging, so the
    /// limiter resolves no server identity.
    pub fn not_logging() -> Self {
        Self {
            logging: false,
            ..Self::new()
        }
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AccessLimitLogEntry> {
        self.entries.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for RecordingAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for RecordingAuditSink {
    fn log(&self, entry: AccessLimitLogEntry) {
        self.entries.lock().push(entry);
    }

    fn is_logging(&self) -> bool {
        self.logging
    }
}
