//! Server identity used to tag audit entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a running limiter instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the identity of this instance.
///
/// Called at most once, when the limiter is built.
pub trait ServerIdentity: Send + Sync {
    fn server_id(&self) -> ServerId;
}

/// A configured, fixed identity.
#[derive(Debug, Clone)]
pub struct FixedServerIdentity(ServerId);

impl FixedServerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(ServerId::new(id))
    }
}

impl ServerIdentity for FixedServerIdentity {
    fn server_id(&self) -> ServerId {
        self.0.clone()
    }
}

/// A random identity generated once per process.
#[derive(Debug, Clone)]
pub struct GeneratedServerIdentity(ServerId);

impl GeneratedServerIdentity {
    pub fn new() -> Self {
        Self(ServerId::new(Uuid::new_v4().to_string()))
    }
}

impl Default for GeneratedServerIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerIdentity for GeneratedServerIdentity {
    fn server_id(&self) -> ServerId {
        self.0.clone()
    }
}
