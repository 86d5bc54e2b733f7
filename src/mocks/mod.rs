//! Mock implementations for testing.
//!
//! To use these in integration tests, enable the `test-helpers` feature:
//!
//! ```toml
//! [dev-dependencies]
//! request-limiter = { path = ".", features = ["test-helpers"] }
//! ```

pub mod audit;
pub mod clock;

pub use audit::RecordingAuditSink;
pub use clock::MockClock;
