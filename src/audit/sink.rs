//! Audit sinks for limit violations.

use std::fmt;
use std::io::Write;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::identity::ServerId;

/// Which limit an audit entry reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditKind {
    /// Request count within the window exceeded the limit
    MaxRequestPerPeriod,
    /// Request size within the window exceeded the limit; used for both
    /// standard and discounted accounting
    MaxRequestSizePerPeriod,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::MaxRequestPerPeriod => "MaxRequestPerPeriod",
            AuditKind::MaxRequestSizePerPeriod => "MaxRequestSizePerPeriod",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record of one denied request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLimitLogEntry {
    pub kind: AuditKind,
    pub server: Option<ServerId>,
    pub message: String,
}

impl AccessLimitLogEntry {
    pub fn new(kind: AuditKind, server: Option<ServerId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            server,
            message: message.into(),
        }
    }
}

/// Destination for audit entries.
///
/// Logging is fire-and-forget: a sink handles its own failures and never
/// reports them to the limiter.
pub trait AuditSink: Send + Sync {
    /// Record an entry.
    fn log(&self, entry: AccessLimitLogEntry);

    /// Whether this sink records anything. The server identity is only
    /// resolved for sinks that do.
    fn is_logging(&self) -> bool {
        true
    }
}

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn log(&self, _entry: AccessLimitLogEntry) {}

    fn is_logging(&self) -> bool {
        false
    }
}

/// Emits entries as `warn` events on the `request_limiter::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, entry: AccessLimitLogEntry) {
        let server = entry.server.as_ref().map(ServerId::as_str).unwrap_or("-");
        warn!(
            target: "request_limiter::audit",
            kind = %entry.kind,
            server = server,
            "{}",
            entry.message
        );
    }
}

/// Writes each entry as one line of JSON.
pub struct JsonAuditSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonAuditSink {
    /// Create a sink writing to `writer`.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Create a sink writing to standard error.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    fn write_entry(&self, entry: &AccessLimitLogEntry) -> crate::error::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for JsonAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonAuditSink").finish_non_exhaustive()
    }
}

impl AuditSink for JsonAuditSink {
    fn log(&self, entry: AccessLimitLogEntry) {
        if let Err(e) = self.write_entry(&entry) {
            warn!(error = %e, kind = %entry.kind, "Failed to write audit entry");
        }
    }
}
