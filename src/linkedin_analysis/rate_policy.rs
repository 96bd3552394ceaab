// src/linkedin_analysis/rate_policy.rs
use std::time::Duration;

/// Flat pause taken after every model request, successful or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    delay: Duration,
}

impl RatePolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_policy_sleeps() {
        let policy = RatePolicy::fixed(Duration::from_millis(20));
        let started = std::time::Instant::now();
        policy.pause().await;
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_none_policy_returns_immediately() {
        let policy = RatePolicy::none();
        assert_eq!(policy.delay(), Duration::ZERO);
        policy.pause().await;
    }
}
