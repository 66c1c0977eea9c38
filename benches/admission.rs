//! 准入限流性能基准测试

use criterion::{Criterion, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;
use url_shortener::services::AdmissionLimiter;

fn bench_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission/admit");

    // 容量足够大，始终放行；短窗口让队列长度保持有界
    group.bench_function("accept", |b| {
        let limiter = AdmissionLimiter::new(usize::MAX, Duration::from_millis(1));
        b.iter(|| limiter.admit().is_ok());
    });

    // 窗口已满，始终拒绝
    group.bench_function("reject", |b| {
        let limiter = AdmissionLimiter::new(1_000, Duration::from_secs(3600));
        while limiter.admit().is_ok() {}
        b.iter(|| limiter.admit().is_err());
    });

    // 极短窗口，每次都要清理过期记录
    group.bench_function("expire_and_admit", |b| {
        let limiter = AdmissionLimiter::new(64, Duration::from_nanos(1));
        b.iter(|| limiter.admit().is_ok());
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission/contended");
    group.sample_size(20);

    group.bench_function("4_threads", |b| {
        let limiter = Arc::new(AdmissionLimiter::new(usize::MAX, Duration::from_millis(1)));
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    std::thread::spawn(move || {
                        for _ in 0..256 {
                            let _ = limiter.admit();
                        }
                    })
                })
                .collect();
            for h in handles {
                let _ = h.join();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_admit, bench_contended);
criterion_main!(benches);
