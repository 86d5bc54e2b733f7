//! Core rate limiter implementation.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, trace};

use crate::audit::{
    AccessLimitLogEntry, AuditKind, AuditSink, FixedServerIdentity, GeneratedServerIdentity,
    JsonAuditSink, NoopAuditSink, ServerId, ServerIdentity, TracingAuditSink,
};
use crate::config::{AuditFormat, LimiterServiceConfig, RateLimiterConfig};

use super::classifier::{ModeParamClassifier, Params, RequestClassifier, StandardClassifier};
use super::clock::{Clock, SystemClock};
use super::decision::{Decision, RateLimitExceeded};
use super::event::{RequestClass, RequestEvent};
use super::store::EventStore;

/// Parameter holding the request payload.
const TEXT_PARAM: &str = "text";
/// Fallback payload parameter when no `text` is present.
const DATA_PARAM: &str = "data";

/// Per-address admission control over a rolling window.
///
/// Every checked request is recorded in a shared, bounded history and the
/// history is then scanned for the requesting address. The limiter is
/// thread-safe and holds no lock across the record-then-scan sequence, so
/// concurrent requests from one address can briefly overshoot a limit.
pub struct RateLimiter {
    config: RateLimiterConfig,
    store: EventStore,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    classifier: Box<dyn RequestClassifier>,
    /// Resolved once at construction; `None` when the sink is not logging
    server: Option<ServerId>,
}

impl RateLimiter {
    /// Create a limiter with the system clock, tracing audit sink and a
    /// classifier that treats every request as standard.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building a limiter with custom collaborators.
    pub fn builder(config: RateLimiterConfig) -> RateLimiterBuilder {
        RateLimiterBuilder::new(config)
    }

    /// Record a request and check whether `address` is still within its
    /// limits.
    ///
    /// The request is recorded before the check, so denied requests count
    /// towards the window as well.
    pub fn check_access(&self, address: &str, params: &Params) -> Decision {
        let cost = request_size(params);
        let class = self.classifier.classify(params);

        self.store
            .append(RequestEvent::new(address, self.clock.now(), cost, class));

        debug!(
            address = %address,
            cost = cost,
            class = ?class,
            "Recorded request"
        );

        self.check_limit(address)
    }

    /// Check the recorded history of `address` against the limits without
    /// recording anything.
    ///
    /// Events are visited in insertion order and the first one that pushes
    /// the count or the size over its limit decides the outcome. The count
    /// of an event is checked before its cost is added.
    pub fn check_limit(&self, address: &str) -> Decision {
        let threshold = self.window_start(self.clock.now());
        let request_limit = self.config.request_limit;
        let limit_in_bytes = self.config.request_limit_in_bytes;

        let mut requests: u64 = 0;
        let mut size: u64 = 0;

        let snapshot = self.store.snapshot();
        trace!(
            address = %address,
            history = snapshot.len(),
            threshold = %threshold,
            "Scanning request history"
        );

        let in_window = snapshot
            .iter()
            .filter(|event| event.address() == address && event.timestamp() > threshold);

        for event in in_window {
            requests += 1;
            if exceeds(requests, request_limit) {
                self.audit(
                    AuditKind::MaxRequestPerPeriod,
                    format!(
                        "limit: {} / {}, requests: {}, ip: {}",
                        request_limit, self.period(), requests, address
                    ),
                );
                return Decision::Denied(RateLimitExceeded::count(request_limit, self.period()));
            }

            let discounted = event.class() == RequestClass::Discounted;
            size = size.saturating_add(event.weighted_cost());
            if exceeds(size, limit_in_bytes) {
                let scope = if discounted { " in discounted class" } else { "" };
                self.audit(
                    AuditKind::MaxRequestSizePerPeriod,
                    format!(
                        "limit{}: {} / {}, request size: {}, ip: {}",
                        scope,
                        limit_in_bytes,
                        self.period(),
                        size,
                        address
                    ),
                );
                return Decision::Denied(RateLimitExceeded::size(
                    limit_in_bytes,
                    self.period(),
                    discounted,
                ));
            }
        }

        Decision::Allowed
    }

    /// The maximum number of requests per period; zero or less disables it.
    pub fn request_limit(&self) -> i64 {
        self.config.request_limit
    }

    /// The maximum accumulated request size per period; zero or less
    /// disables it.
    pub fn request_limit_in_bytes(&self) -> i64 {
        self.config.request_limit_in_bytes
    }

    /// The window length in seconds.
    pub fn request_limit_period_in_seconds(&self) -> u64 {
        self.config.request_limit_period_in_seconds
    }

    /// The shared request history.
    pub fn history(&self) -> &EventStore {
        &self.store
    }

    /// Identity attached to audit entries, if any.
    pub fn server_id(&self) -> Option<&ServerId> {
        self.server.as_ref()
    }

    fn period(&self) -> u64 {
        self.config.request_limit_period_in_seconds
    }

    /// Events at or before the returned instant are outside the window.
    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.period())
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|period| now.checked_sub_signed(period))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn audit(&self, kind: AuditKind, message: String) {
        debug!(kind = %kind, "Rate limit exceeded");
        self.audit
            .log(AccessLimitLogEntry::new(kind, self.server.clone(), message));
    }
}

impl RateLimiter {
    /// Build a limiter and its collaborators from service configuration.
    pub fn from_service_config(config: &LimiterServiceConfig) -> Self {
        let sink: Arc<dyn AuditSink> = match (config.audit.enabled, config.audit.format) {
            (false, _) => Arc::new(NoopAuditSink),
            (true, AuditFormat::Tracing) => Arc::new(TracingAuditSink),
            (true, AuditFormat::Json) => Arc::new(JsonAuditSink::stderr()),
        };

        let mut builder = Self::builder(config.limiter.clone())
            .with_shared_audit_sink(sink)
            .with_classifier(ModeParamClassifier::new(
                config.classifier.mode_key.clone(),
                config.classifier.discounted_mode.clone(),
            ));
        if let Some(ref id) = config.audit.server_id {
            builder = builder.with_server_identity(FixedServerIdentity::new(id.clone()));
        }
        builder.build()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("history", &self.store.len())
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

/// Whether `observed` crosses `limit`. Non-positive limits never trip.
fn exceeds(observed: u64, limit: i64) -> bool {
    limit > 0 && observed > limit as u64
}

/// Approximate size of a request: the length of its `text` parameter, else
/// of its `data` parameter, else zero.
///
/// Length is counted in UTF-16 code units, so a character outside the Basic
/// Multilingual Plane costs two.
pub fn request_size(params: &Params) -> u64 {
    params
        .get(TEXT_PARAM)
        .or_else(|| params.get(DATA_PARAM))
        .map(|value| value.encode_utf16().count() as u64)
        .unwrap_or(0)
}

/// Builder for [`RateLimiter`].
pub struct RateLimiterBuilder {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    classifier: Box<dyn RequestClassifier>,
    identity: Option<Box<dyn ServerIdentity>>,
}

impl RateLimiterBuilder {
    fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock::new()),
            audit: Arc::new(TracingAuditSink),
            classifier: Box::new(StandardClassifier),
            identity: None,
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_audit_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.audit = Arc::new(sink);
        self
    }

    /// Use an already shared audit sink.
    pub fn with_shared_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_classifier<R: RequestClassifier + 'static>(mut self, classifier: R) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Identity used to tag audit entries. A random identity is generated
    /// when none is given and the audit sink is logging.
    pub fn with_server_identity<I: ServerIdentity + 'static>(mut self, identity: I) -> Self {
        self.identity = Some(Box::new(identity));
        self
    }

    pub fn build(self) -> RateLimiter {
        let server = if self.audit.is_logging() {
            let identity = self
                .identity
                .unwrap_or_else(|| Box::new(GeneratedServerIdentity::new()));
            Some(identity.server_id())
        } else {
            None
        };

        debug!(
            request_limit = self.config.request_limit,
            request_limit_in_bytes = self.config.request_limit_in_bytes,
            period_secs = self.config.request_limit_period_in_seconds,
            history_capacity = self.config.history_capacity,
            "Creating rate limiter"
        );

        RateLimiter {
            store: EventStore::with_capacity(self.config.history_capacity),
            config: self.config,
            clock: self.clock,
            audit: self.audit,
            classifier: self.classifier,
            server,
        }
    }
}
