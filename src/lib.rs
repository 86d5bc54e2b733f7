//! Request Limiter - per-address admission control
//!
//! This crate decides whether a request from a given client address may be
//! processed. It keeps a bounded, shared history of recent requests and denies
//! an address once its request count or cumulative request size within a
//! rolling time window crosses the configured limits.

pub mod audit;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod replay;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
