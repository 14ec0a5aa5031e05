//! Self-trigger schedules

use actorsim_config::ScheduleConfig;
use std::time::Duration;

/// When and how often an actor wakes itself up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub initial_delay: Duration,
    /// `Duration::ZERO` fires exactly once
    pub period: Duration,
    pub burst_count: u32,
}

impl ScheduleSpec {
    /// Periodic schedule whose first trigger lands one period after start
    pub fn every(period: Duration) -> Self {
        Self {
            initial_delay: period,
            period,
            burst_count: 1,
        }
    }

    /// Single trigger after `delay`
    pub fn once(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            period: Duration::ZERO,
            burst_count: 1,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_burst(mut self, burst_count: u32) -> Self {
        self.burst_count = burst_count;
        self
    }

    pub fn is_periodic(&self) -> bool {
        !self.period.is_zero()
    }
}

impl From<&ScheduleConfig> for ScheduleSpec {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms()),
            period: Duration::from_millis(config.period_ms),
            burst_count: config.burst_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_starts_after_one_period() {
        let spec = ScheduleSpec::every(Duration::from_millis(100)).with_burst(10);
        assert_eq!(spec.initial_delay, Duration::from_millis(100));
        assert_eq!(spec.burst_count, 10);
        assert!(spec.is_periodic());
    }

    #[test]
    fn test_once_is_not_periodic() {
        assert!(!ScheduleSpec::once(Duration::ZERO).is_periodic());
    }

    #[test]
    fn test_from_config() {
        let config = ScheduleConfig {
            initial_delay_ms: Some(5),
            period_ms: 50,
            burst_count: 2,
        };
        let spec = ScheduleSpec::from(&config);
        assert_eq!(spec.initial_delay, Duration::from_millis(5));
        assert_eq!(spec.period, Duration::from_millis(50));
        assert_eq!(spec.burst_count, 2);
    }
}
