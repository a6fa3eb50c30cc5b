use courier::limiter::RateLimiter;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::collections::HashMap;

fn bench_check_allowed(c: &mut Criterion) {
    // Fresh limiter per iteration so the bucket never saturates
    c.bench_function("limiter_check_allow", |b| {
        b.iter_batched(
            || RateLimiter::new(100, 60, HashMap::new()),
            |limiter| limiter.check(black_box("bench-service"), None),
            BatchSize::SmallInput,
        )
    });
}

fn bench_check_denied(c: &mut Criterion) {
    let limiter = RateLimiter::new(1, 60, HashMap::new());
    limiter.check("bench-service", None);

    c.bench_function("limiter_check_deny", |b| {
        b.iter(|| limiter.check(black_box("bench-service"), None))
    });
}

fn bench_per_type_check(c: &mut Criterion) {
    c.bench_function("limiter_check_typed", |b| {
        b.iter_batched(
            || {
                let mut per_type = HashMap::new();
                per_type.insert("trade".to_string(), 100);
                RateLimiter::new(100, 60, per_type)
            },
            |limiter| limiter.check(black_box("bench-service"), Some("trade")),
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_stats(c: &mut Criterion) {
    let limiter = RateLimiter::new(100, 60, HashMap::new());
    for _ in 0..50 {
        limiter.check("bench-service", None);
    }

    c.bench_function("limiter_get_stats", |b| {
        b.iter(|| limiter.get_stats(black_box("bench-service"), None))
    });
}

criterion_group!(
    benches,
    bench_check_allowed,
    bench_check_denied,
    bench_per_type_check,
    bench_get_stats
);
criterion_main!(benches);
