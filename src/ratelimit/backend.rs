//! Admission control trait for abstracting the limiter from its callers.

use std::sync::Arc;

use super::classifier::Params;
use super::decision::Decision;
use super::limiter::RateLimiter;

/// Trait for admission control implementations.
///
/// Dispatchers depend on this trait rather than on [`RateLimiter`] so that
/// they can be exercised with a different policy.
pub trait AdmissionControl: Send + Sync {
    /// Record a request from `address` and decide whether to admit it.
    fn check_access(&self, address: &str, params: &Params) -> Decision;
}

impl AdmissionControl for RateLimiter {
    fn check_access(&self, address: &str, params: &Params) -> Decision {
        RateLimiter::check_access(self, address, params)
    }
}

impl<T: AdmissionControl + ?Sized> AdmissionControl for Arc<T> {
    fn check_access(&self, address: &str, params: &Params) -> Decision {
        (**self).check_access(address, params)
    }
}
