//! Global sliding-window admission limiter
//!
//! 所有请求共享一个时间窗口：窗口内已放行的请求数达到上限后，新请求被拒绝，
//! 直到最早的记录滑出窗口。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::errors::{Result, ShortenerError};

pub struct AdmissionLimiter {
    /// 按放行时间排序（队首最早）
    window: Mutex<VecDeque<Instant>>,
    capacity: usize,
    window_len: Duration,
}

impl AdmissionLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            window_len: window,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window_len
    }

    /// Number of admissions still inside the window (expired ones included until the next clean).
    pub fn in_flight(&self) -> usize {
        self.window.lock().len()
    }

    /// Drop admissions older than the window. Returns how many were removed.
    pub fn clean(&self) -> usize {
        let mut queue = self.window.lock();
        Self::clean_locked(&mut queue, self.window_len, Instant::now())
    }

    /// Record one admission, or fail with `LimitReached` when the window is full.
    ///
    /// Expired admissions still count here: run [`clean`](Self::clean) first, or use
    /// [`admit`](Self::admit).
    pub fn add(&self) -> Result<()> {
        let mut queue = self.window.lock();
        self.add_locked(&mut queue, Instant::now())
    }

    /// `clean` followed by `add` under one lock acquisition.
    pub fn admit(&self) -> Result<()> {
        let now = Instant::now();
        let mut queue = self.window.lock();
        let cleaned = Self::clean_locked(&mut queue, self.window_len, now);
        if cleaned > 0 {
            trace!("Admission window released {} slots", cleaned);
        }
        self.add_locked(&mut queue, now)
    }

    fn clean_locked(queue: &mut VecDeque<Instant>, window: Duration, now: Instant) -> usize {
        let mut cleaned = 0;
        while let Some(oldest) = queue.front() {
            if now.saturating_duration_since(*oldest) <= window {
                break;
            }
            queue.pop_front();
            cleaned += 1;
        }
        cleaned
    }

    fn add_locked(&self, queue: &mut VecDeque<Instant>, now: Instant) -> Result<()> {
        if queue.len() >= self.capacity {
            return Err(ShortenerError::limit_reached(format!(
                "{} requests admitted within {:?}",
                queue.len(),
                self.window_len
            )));
        }
        queue.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_rejects_once_full() {
        let limiter = AdmissionLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.admit().is_ok());
        assert!(limiter.admit().is_ok());
        assert!(matches!(
            limiter.admit(),
            Err(ShortenerError::LimitReached(_))
        ));
        assert_eq!(limiter.in_flight(), 2);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let limiter = AdmissionLimiter::new(0, Duration::from_secs(1));
        assert!(limiter.add().is_err());
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_clean_releases_expired() {
        let limiter = AdmissionLimiter::new(1, Duration::from_millis(20));
        limiter.add().unwrap();
        assert_eq!(limiter.clean(), 0);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(limiter.clean(), 1);
        assert!(limiter.add().is_ok());
    }

    #[test]
    fn test_add_without_clean_keeps_expired_slots() {
        let limiter = AdmissionLimiter::new(1, Duration::from_millis(20));
        limiter.add().unwrap();
        std::thread::sleep(Duration::from_millis(40));

        assert!(limiter.add().is_err());
        assert!(limiter.admit().is_ok());
    }

    #[test]
    fn test_clean_locked_keeps_fresh_entries() {
        let start = Instant::now();
        let mut queue: VecDeque<Instant> = VecDeque::new();
        queue.push_back(start);
        queue.push_back(start + Duration::from_secs(5));

        let now = start + Duration::from_secs(7);
        let cleaned = AdmissionLimiter::clean_locked(&mut queue, Duration::from_secs(3), now);
        assert_eq!(cleaned, 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_capacity() {
        let limiter = Arc::new(AdmissionLimiter::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..20).filter(|_| limiter.admit().is_ok()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
        assert_eq!(limiter.in_flight(), 50);
    }
}
