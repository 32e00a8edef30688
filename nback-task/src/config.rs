use nback_core::{KeyBindings, Stimulus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response-deadline bounds, milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineConfig {
    pub initial_ms: u32,
    pub min_ms: u32,
    pub max_ms: u32,
    pub step_ms: u32,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            initial_ms: 2000,
            min_ms: 2000,
            max_ms: 3500,
            step_ms: 500,
        }
    }
}

/// Host-supplied run parameters, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct TaskConfig<S> {
    pub catalog: Vec<S>,
    /// Judged trials per block.
    pub block_len: usize,
    /// Matches the generator aims for per block.
    pub target_count: usize,
    /// The K of the K-back stages.
    pub kback_lag: usize,
    pub fixed_test_blocks: usize,
    pub kback_test_blocks: usize,
    pub keys: KeyBindings,
    pub deadline: DeadlineConfig,
}

impl<S: Stimulus> TaskConfig<S> {
    /// Reference design defaults: blocks of 20 judged trials aiming for 7
    /// matches, 2-back, one fixed test block and two 2-back test blocks.
    pub fn new(catalog: Vec<S>) -> Self {
        Self {
            catalog,
            block_len: 20,
            target_count: 7,
            kback_lag: 2,
            fixed_test_blocks: 1,
            kback_test_blocks: 2,
            keys: KeyBindings::default(),
            deadline: DeadlineConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.len() < 2 {
            return Err(ConfigError::CatalogTooSmall {
                len: self.catalog.len(),
            });
        }
        for (i, stimulus) in self.catalog.iter().enumerate() {
            if self.catalog[i + 1..].contains(stimulus) {
                return Err(ConfigError::DuplicateStimulus { index: i });
            }
        }
        if self.block_len == 0 {
            return Err(ConfigError::EmptyBlock);
        }
        if self.target_count == 0 {
            return Err(ConfigError::NoTargets);
        }
        if self.kback_lag == 0 || self.kback_lag >= self.block_len {
            return Err(ConfigError::LagOutOfRange {
                lag: self.kback_lag,
                block_len: self.block_len,
            });
        }
        if self.fixed_test_blocks == 0 || self.kback_test_blocks == 0 {
            return Err(ConfigError::NoTestBlocks);
        }
        if self.keys.match_key == self.keys.mismatch_key {
            return Err(ConfigError::KeyClash);
        }
        let d = &self.deadline;
        if d.step_ms == 0 || d.min_ms > d.initial_ms || d.initial_ms > d.max_ms {
            return Err(ConfigError::DeadlineBounds);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("stimulus catalog has {len} entries, need at least 2")]
    CatalogTooSmall { len: usize },
    #[error("stimulus catalog entry {index} appears more than once")]
    DuplicateStimulus { index: usize },
    #[error("block length must be positive")]
    EmptyBlock,
    #[error("target count must be positive")]
    NoTargets,
    #[error("lag {lag} must be positive and smaller than the block length {block_len}")]
    LagOutOfRange { lag: usize, block_len: usize },
    #[error("each condition needs at least one test block")]
    NoTestBlocks,
    #[error("match and mismatch keys must differ")]
    KeyClash,
    #[error("deadline bounds must satisfy min <= initial <= max with a positive step")]
    DeadlineBounds,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TaskConfig<&'static str> {
        TaskConfig::new(vec!["bee", "fish", "lion", "pig"])
    }

    #[test]
    fn reference_defaults() {
        let config = base();
        assert_eq!(config.block_len, 20);
        assert_eq!(config.target_count, 7);
        assert_eq!(config.kback_lag, 2);
        assert_eq!(config.deadline, DeadlineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn catalog_must_hold_two_distinct_stimuli() {
        let mut config = base();
        config.catalog = vec!["bee"];
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::CatalogTooSmall { len: 1 }
        );

        let mut config = base();
        config.catalog = vec!["bee", "fish", "bee"];
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::DuplicateStimulus { index: 0 }
        );
    }

    #[test]
    fn counts_must_be_positive() {
        let mut config = base();
        config.block_len = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::EmptyBlock);

        let mut config = base();
        config.target_count = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoTargets);

        let mut config = base();
        config.fixed_test_blocks = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoTestBlocks);

        let mut config = base();
        config.kback_test_blocks = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoTestBlocks);
    }

    #[test]
    fn lag_must_fit_the_block() {
        let mut config = base();
        config.kback_lag = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::LagOutOfRange { lag: 0, .. }
        ));

        let mut config = base();
        config.kback_lag = config.block_len;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::LagOutOfRange { .. }
        ));
    }

    #[test]
    fn keys_must_differ() {
        let mut config = base();
        config.keys.mismatch_key = config.keys.match_key;
        assert_eq!(config.validate().unwrap_err(), ConfigError::KeyClash);
    }

    #[test]
    fn deadline_bounds_are_checked() {
        let mut config = base();
        config.deadline.step_ms = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::DeadlineBounds);

        let mut config = base();
        config.deadline.initial_ms = 4000;
        assert_eq!(config.validate().unwrap_err(), ConfigError::DeadlineBounds);

        let mut config = base();
        config.deadline.min_ms = 2500;
        assert_eq!(config.validate().unwrap_err(), ConfigError::DeadlineBounds);
    }

    #[test]
    fn oversized_target_count_is_allowed() {
        // the lag-0 repair clamps instead; see sequence tests
        let mut config = base();
        config.target_count = config.block_len + 10;
        assert!(config.validate().is_ok());
    }
}
