//! Simulated per-step work duration.

use std::time::Duration;

use rand::Rng;

/// Random sleep between steps, drawn uniformly from `[min, max]`.
/// A zero `max` disables pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepPacing {
    pub min: Duration,
    pub max: Duration,
}

impl StepPacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.max;
        }
        let ms = rand::rng().random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_in_range() {
        let pacing = StepPacing::new(Duration::from_millis(5), Duration::from_millis(10));
        for _ in 0..50 {
            let d = pacing.sample();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
        }
    }

    #[test]
    fn inverted_bounds_are_clamped() {
        let pacing = StepPacing::new(Duration::from_millis(20), Duration::from_millis(10));
        assert_eq!(pacing.sample(), Duration::from_millis(10));
    }

    #[test]
    fn default_is_no_delay() {
        assert_eq!(StepPacing::none().sample(), Duration::ZERO);
    }
}
