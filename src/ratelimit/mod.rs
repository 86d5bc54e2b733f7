//! Rate limiting logic and state management.

mod backend;
pub mod classifier;
mod clock;
mod decision;
mod event;
mod limiter;
pub mod store;

pub use backend::AdmissionControl;
pub use classifier::{ModeParamClassifier, Params, RequestClassifier, StandardClassifier};
pub use clock::{Clock, SystemClock};
pub use decision::{Decision, LimitKind, RateLimitExceeded};
pub use event::{RequestClass, RequestEvent};
pub use limiter::{request_size, RateLimiter, RateLimiterBuilder};
pub use store::{EventSnapshot, EventStore};
