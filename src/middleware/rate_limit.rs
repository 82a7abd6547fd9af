//! In-memory sliding-window limiter, keyed by client IP for the login route.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records a hit for `identifier`. `Err` carries how long until the
    /// oldest hit leaves the window.
    pub async fn check(&self, identifier: &str) -> Result<(), Duration> {
        self.check_at(identifier, Instant::now()).await
    }

    async fn check_at(&self, identifier: &str, now: Instant) -> Result<(), Duration> {
        let mut requests = self.requests.write().await;
        let history = requests.entry(identifier.to_string()).or_default();

        history.retain(|&t| now.duration_since(t) < self.window);

        if history.len() < self.max_requests {
            history.push(now);
            return Ok(());
        }

        let oldest = history.iter().min().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Drops identifiers with no hits left in the window. Returns how many
    /// were removed.
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now()).await
    }

    async fn cleanup_at(&self, now: Instant) -> usize {
        let mut requests = self.requests.write().await;
        let before = requests.len();

        requests.retain(|_, history| {
            history.retain(|&t| now.duration_since(t) < self.window);
            !history.is_empty()
        });

        let removed = before - requests.len();
        tracing::debug!("Rate limiter cleanup: removed {}, {} still active", removed, requests.len());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_per_identifier() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_ok());

        let wait = limiter.check("10.0.0.1").await.unwrap_err();
        assert!(wait <= Duration::from_secs(60));
        assert!(wait > Duration::from_secs(50));

        assert!(limiter.check("10.0.0.2").await.is_ok());
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = RateLimiter::new(1, 10);
        let start = Instant::now();
        assert!(limiter.check_at("ip", start).await.is_ok());
        assert!(limiter.check_at("ip", start + Duration::from_secs(5)).await.is_err());
        assert!(limiter.check_at("ip", start + Duration::from_secs(11)).await.is_ok());
    }

    #[tokio::test]
    async fn cleanup_counts_removed_clients() {
        let limiter = RateLimiter::new(5, 10);
        let start = Instant::now();

        limiter.check_at("ip1", start).await.ok();
        limiter.check_at("ip2", start).await.ok();
        limiter.check_at("ip3", start + Duration::from_secs(8)).await.ok();

        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(5)).await, 0);
        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(12)).await, 2);
        assert_eq!(limiter.requests.read().await.len(), 1);
        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(20)).await, 1);
    }
}
