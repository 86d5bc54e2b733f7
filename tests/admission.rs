use std::sync::Arc;
use std::thread;

use chrono::Duration;
use request_limiter::audit::{AuditKind, FixedServerIdentity, ServerId};
use request_limiter::config::RateLimiterConfig;
use request_limiter::mocks::{MockClock, RecordingAuditSink};
use request_limiter::ratelimit::{
    AdmissionControl, LimitKind, ModeParamClassifier, Params, RateLimiter, RequestClass,
};

fn params(entries: &[(&str, &str)]) -> Params {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build(config: RateLimiterConfig) -> (RateLimiter, MockClock, RecordingAuditSink) {
    let clock = MockClock::default();
    let audit = RecordingAuditSink::new();
    let limiter = RateLimiter::builder(config)
        .with_clock(clock.clone())
        .with_audit_sink(audit.clone())
        .with_classifier(ModeParamClassifier::default())
        .with_server_identity(FixedServerIdentity::new("it-server"))
        .build();
    (limiter, clock, audit)
}

#[test]
fn test_nth_plus_one_request_is_denied() {
    let n = 5;
    let (limiter, _clock, audit) = build(RateLimiterConfig::new(n, 0, 60));

    for _ in 0..n {
        assert!(limiter.check_access("192.168.1.1", &Params::new()).is_allowed());
    }

    let err = limiter
        .check_access("192.168.1.1", &Params::new())
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), LimitKind::Count);

    // The rejected request was recorded all the same.
    assert_eq!(limiter.history().len(), n as usize + 1);

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, AuditKind::MaxRequestPerPeriod);
    assert_eq!(entries[0].server, Some(ServerId::new("it-server")));
    assert!(entries[0].message.contains("ip: 192.168.1.1"));
}

#[test]
fn test_success_produces_no_audit_entry() {
    let (limiter, _clock, audit) = build(RateLimiterConfig::new(10, 1000, 60));

    for _ in 0..10 {
        assert!(limiter
            .check_access("a", &params(&[("text", "short")]))
            .is_allowed());
    }
    assert_eq!(audit.count(), 0);
}

#[test]
fn test_other_addresses_do_not_contribute() {
    let (limiter, _clock, _audit) = build(RateLimiterConfig::new(1, 10, 60));

    let denied = (0..20)
        .filter(|_| {
            !limiter
                .check_access("noisy", &params(&[("text", "0123456789abc")]))
                .is_allowed()
        })
        .count();
    assert_eq!(denied, 20);

    assert!(limiter.check_limit("quiet").is_allowed());
    assert!(limiter
        .check_access("quiet", &params(&[("text", "0123456789")]))
        .is_allowed());
}

#[test]
fn test_window_boundary_is_open_on_the_old_side() {
    let (limiter, clock, _audit) = build(RateLimiterConfig::new(1, 0, 30));

    assert!(limiter.check_access("a", &Params::new()).is_allowed());

    clock.advance(Duration::seconds(30) - Duration::milliseconds(1));
    assert!(limiter.check_limit("a").is_allowed());
    // One more recorded request still sees the first one.
    assert!(!limiter.check_access("a", &Params::new()).is_allowed());

    // Both events are now at or before the threshold.
    clock.advance(Duration::seconds(30));
    assert!(limiter.check_access("a", &Params::new()).is_allowed());
}

#[test]
fn test_discounted_class_scenario() {
    let (limiter, _clock, audit) = build(RateLimiterConfig::new(0, 250, 60));
    let payload = "t".repeat(1000);
    let request = params(&[("text", payload.as_str()), ("mode", "textLevelOnly")]);

    assert!(limiter.check_access("a", &request).is_allowed());
    assert!(limiter.check_access("a", &request).is_allowed());

    let err = limiter.check_access("a", &request).into_result().unwrap_err();
    assert_eq!(err.kind(), LimitKind::Size { discounted: true });

    assert!(limiter
        .history()
        .snapshot()
        .iter()
        .all(|e| e.class() == RequestClass::Discounted && e.cost() == 1000));
    assert_eq!(audit.entries()[0].kind, AuditKind::MaxRequestSizePerPeriod);
}

#[test]
fn test_standard_size_scenario() {
    let (limiter, _clock, _audit) = build(RateLimiterConfig::new(0, 100, 60));
    let sixty = "s".repeat(60);
    let request = params(&[("text", sixty.as_str())]);

    assert!(limiter.check_access("x", &request).is_allowed());

    let err = limiter.check_access("x", &request).into_result().unwrap_err();
    assert_eq!(err.kind(), LimitKind::Size { discounted: false });
}

#[test]
fn test_global_eviction_drops_oldest_regardless_of_address() {
    let (limiter, _clock, _audit) = build(RateLimiterConfig::new(0, 0, 3600));

    assert!(limiter.check_access("victim", &Params::new()).is_allowed());
    for i in 0..1500 {
        let decision = limiter.check_access(&format!("flood-{}", i % 7), &Params::new());
        assert!(decision.is_allowed());
        assert!(limiter.history().len() <= 1001);
    }

    let snapshot = limiter.history().snapshot();
    assert_eq!(snapshot.len(), 1001);
    assert!(snapshot.iter().all(|e| e.address() != "victim"));
}

#[test]
fn test_shared_limiter_across_threads() {
    let (limiter, _clock, audit) = build(RateLimiterConfig::new(25, 0, 60));
    let limiter: Arc<dyn AdmissionControl> = Arc::new(limiter);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                let address = format!("10.1.0.{}", t);
                (0..25)
                    .filter(|_| limiter.check_access(&address, &Params::new()).is_allowed())
                    .count()
            })
        })
        .collect();

    for handle in handles {
        // Each thread owns its address, so all of its requests fit.
        assert_eq!(handle.join().unwrap(), 25);
    }
    assert_eq!(audit.count(), 0);
}
