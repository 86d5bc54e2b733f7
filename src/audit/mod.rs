//! Audit logging of denied requests.

mod identity;
mod sink;

pub use identity::{FixedServerIdentity, GeneratedServerIdentity, ServerId, ServerIdentity};
pub use sink::{
    AccessLimitLogEntry, AuditKind, AuditSink, JsonAuditSink, NoopAuditSink, TracingAuditSink,
};
