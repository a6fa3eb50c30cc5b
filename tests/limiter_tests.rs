//! Sliding-window rate limiter tests

use courier::limiter::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn per_type(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_ceiling_is_never_exceeded_within_window() {
    let limiter = RateLimiter::new(10, 60, HashMap::new());

    let allowed = (0..50)
        .filter(|_| limiter.check("svc", None).allowed)
        .count();
    assert_eq!(allowed, 10);
}

#[test]
fn test_denial_reports_retry_after() {
    let limiter = RateLimiter::new(1, 60, HashMap::new());
    assert!(limiter.check("svc", None).allowed);

    let denied = limiter.check("svc", None);
    assert!(!denied.allowed);
    assert!(denied.retry_after_seconds >= 1);
    assert!(denied.retry_after_seconds <= 61);
}

#[test]
fn test_per_type_ceiling_overrides_global() {
    let limiter = RateLimiter::new(100, 60, per_type(&[("strategy", 1)]));

    assert!(limiter.check("svc", Some("strategy")).allowed);
    assert!(!limiter.check("svc", Some("strategy")).allowed);

    // Other types and the untyped path still use the global ceiling
    assert!(limiter.check("svc", Some("trade")).allowed);
    assert!(limiter.check("svc", None).allowed);
}

#[test]
fn test_window_slides() {
    let limiter = RateLimiter::new(2, 1, HashMap::new());
    assert!(limiter.check("svc", None).allowed);
    assert!(limiter.check("svc", None).allowed);
    assert!(!limiter.check("svc", None).allowed);

    std::thread::sleep(Duration::from_millis(1100));
    assert!(limiter.check("svc", None).allowed);
}

#[test]
fn test_stats_reflect_usage() {
    let limiter = RateLimiter::new(4, 60, HashMap::new());
    limiter.check("svc", None);

    let stats = limiter.get_stats("svc", None);
    assert_eq!(stats.limit, 4);
    assert_eq!(stats.window_seconds, 60);
    assert_eq!(stats.current_count, 1);
    assert_eq!(stats.remaining, 3);
    assert_eq!(stats.retry_after_seconds, 0);

    for _ in 0..3 {
        limiter.check("svc", None);
    }
    let stats = limiter.get_stats("svc", None);
    assert_eq!(stats.remaining, 0);
    assert!(stats.retry_after_seconds >= 1);
}

#[test]
fn test_clear_resets_buckets() {
    let limiter = RateLimiter::new(1, 60, per_type(&[("trade", 1)]));
    limiter.check("a", None);
    limiter.check("a", Some("trade"));
    limiter.check("b", None);

    limiter.clear(Some("a"), None);
    assert!(limiter.check("a", None).allowed);
    assert!(limiter.check("a", Some("trade")).allowed);
    // "b" untouched
    assert!(!limiter.check("b", None).allowed);
}

#[test]
fn test_concurrent_checks_hold_invariant() {
    let limiter = Arc::new(RateLimiter::new(100, 60, HashMap::new()));
    let mut handles = Vec::new();

    for _ in 0..10 {
        let limiter = limiter.clone();
        handles.push(std::thread::spawn(move || {
            (0..50)
                .filter(|_| limiter.check("shared", None).allowed)
                .count()
        }));
    }

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 100);
}
