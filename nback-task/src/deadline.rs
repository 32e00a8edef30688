use tracing::{info, warn};

use crate::config::DeadlineConfig;

/// Timeout fraction above which the deadline is raised.
const RAISE_RATE: f64 = 0.35;
/// Timeout fraction below which the deadline is lowered.
const LOWER_RATE: f64 = 0.15;
/// Timeout fraction at which the host should warn the participant.
const ADVISORY_RATE: f64 = 0.60;

/// Outcome of one between-block deadline adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineUpdate {
    pub deadline_ms: u32,
    /// Set when the timeout rate crossed the slow-participant threshold.
    /// The deadline does not move further; messaging is up to the host.
    pub slow_advisory: bool,
}

/// Adapts the per-trial response budget to the previous block's timeout
/// rate, one step per block at most, bounded to the configured range.
#[derive(Debug, Clone)]
pub struct DeadlineController {
    deadline_ms: u32,
    config: DeadlineConfig,
}

impl DeadlineController {
    pub fn new(config: DeadlineConfig) -> Self {
        Self {
            deadline_ms: config.initial_ms,
            config,
        }
    }

    pub fn deadline_ms(&self) -> u32 {
        self.deadline_ms
    }

    /// Feeds one block's observed timeouts among its judged trials.
    pub fn update(&mut self, timeout_count: usize, judged_trials: usize) -> DeadlineUpdate {
        if judged_trials == 0 {
            return DeadlineUpdate {
                deadline_ms: self.deadline_ms,
                slow_advisory: false,
            };
        }
        let timeouts = timeout_count as f64;
        let judged = judged_trials as f64;

        if timeouts > RAISE_RATE * judged && self.deadline_ms < self.config.max_ms {
            self.deadline_ms = (self.deadline_ms + self.config.step_ms).min(self.config.max_ms);
            info!(
                deadline_ms = self.deadline_ms,
                timeout_count, "slowing down: deadline raised"
            );
        } else if timeouts < LOWER_RATE * judged && self.deadline_ms > self.config.min_ms {
            self.deadline_ms = self
                .deadline_ms
                .saturating_sub(self.config.step_ms)
                .max(self.config.min_ms);
            info!(
                deadline_ms = self.deadline_ms,
                timeout_count, "speeding up: deadline lowered"
            );
        }

        let slow_advisory = timeouts >= ADVISORY_RATE * judged;
        if slow_advisory {
            warn!(
                timeout_count,
                judged_trials, "participant is missing most response windows"
            );
        }

        DeadlineUpdate {
            deadline_ms: self.deadline_ms,
            slow_advisory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> DeadlineController {
        DeadlineController::new(DeadlineConfig::default())
    }

    #[test]
    fn raises_after_a_slow_block() {
        let mut c = controller();
        let update = c.update(8, 20);
        assert_eq!(update.deadline_ms, 2500);
        assert!(!update.slow_advisory);
    }

    #[test]
    fn lowers_after_a_fast_block() {
        let mut c = controller();
        c.update(8, 20);
        let update = c.update(1, 20);
        assert_eq!(update.deadline_ms, 2000);
    }

    #[test]
    fn dead_band_holds_steady() {
        let mut c = controller();
        c.update(8, 20);
        let update = c.update(4, 20);
        assert_eq!(update.deadline_ms, 2500);
        assert!(!update.slow_advisory);
    }

    #[test]
    fn advisory_fires_at_sixty_percent() {
        let mut c = controller();
        let update = c.update(13, 20);
        assert!(update.slow_advisory);
        // the advisory never adds a second step
        assert_eq!(update.deadline_ms, 2500);

        let mut c = controller();
        assert!(!c.update(11, 20).slow_advisory);
    }

    #[test]
    fn one_step_per_block_and_bounded() {
        let mut c = controller();
        for _ in 0..10 {
            c.update(20, 20);
        }
        assert_eq!(c.deadline_ms(), 3500);
        for _ in 0..10 {
            c.update(0, 20);
        }
        assert_eq!(c.deadline_ms(), 2000);
    }

    #[test]
    fn never_leaves_the_bounds() {
        let mut c = controller();
        let reports = [0usize, 20, 20, 20, 20, 0, 13, 1, 8, 20, 0, 0, 0, 7, 3, 20, 20];
        for &timeouts in &reports {
            let update = c.update(timeouts, 20);
            assert!((2000..=3500).contains(&update.deadline_ms));
        }
    }

    #[test]
    fn thresholds_scale_with_block_length() {
        let mut c = controller();
        assert_eq!(c.update(4, 10).deadline_ms, 2500);
        assert_eq!(c.update(3, 10).deadline_ms, 2500);
        assert_eq!(c.update(1, 10).deadline_ms, 2000);
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let mut c = controller();
        let update = c.update(0, 0);
        assert_eq!(update.deadline_ms, 2000);
        assert!(!update.slow_advisory);
    }
}
