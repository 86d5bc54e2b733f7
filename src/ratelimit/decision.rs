//! Admission decisions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which limit a denied request crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LimitKind {
    /// Too many requests within the window
    Count,
    /// Too many bytes within the window
    Size {
        /// Whether the crossing request was accounted at the discounted rate
        discounted: bool,
    },
}

/// A denial: the address crossed one of its limits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RateLimitExceeded {
    kind: LimitKind,
    message: String,
}

impl RateLimitExceeded {
    pub(crate) fn count(request_limit: i64, period_secs: u64) -> Self {
        Self {
            kind: LimitKind::Count,
            message: format!(
                "Request limit of {} requests per {} seconds exceeded",
                request_limit, period_secs
            ),
        }
    }

    pub(crate) fn size(limit_in_bytes: i64, period_secs: u64, discounted: bool) -> Self {
        let suffix = if discounted {
            " in discounted-class checks"
        } else {
            ""
        };
        Self {
            kind: LimitKind::Size { discounted },
            message: format!(
                "Request size limit of {} bytes per {} seconds exceeded{}",
                limit_in_bytes, period_secs, suffix
            ),
        }
    }

    pub fn kind(&self) -> LimitKind {
        self.kind
    }

    /// Client-facing description of the crossed limit.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of an admission check.
#[must_use = "a denied request must be rejected by the caller"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(RateLimitExceeded),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// The denial, if any.
    pub fn denial(&self) -> Option<&RateLimitExceeded> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(e) => Some(e),
        }
    }

    /// Convert into a `Result` for callers that propagate denials with `?`.
    pub fn into_result(self) -> Result<(), RateLimitExceeded> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(e) => Err(e),
        }
    }
}
