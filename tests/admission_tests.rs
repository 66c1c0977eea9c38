use std::sync::Arc;
use std::time::Duration;

use url_shortener::errors::ShortenerError;
use url_shortener::services::AdmissionLimiter;

#[tokio::test]
async fn test_window_frees_capacity_after_expiry() {
    let limiter = AdmissionLimiter::new(1, Duration::from_secs(3));

    limiter.clean();
    assert!(limiter.add().is_ok());

    limiter.clean();
    assert!(matches!(limiter.add(), Err(ShortenerError::LimitReached(_))));

    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(limiter.clean(), 1);
    assert!(limiter.add().is_ok());
}

#[tokio::test]
async fn test_concurrent_tasks_share_one_window() {
    let limiter = Arc::new(AdmissionLimiter::new(10, Duration::from_secs(60)));

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.admit().is_ok() })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 10);
}
