use serde::{Deserialize, Serialize};

/// Matching condition of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// One target drawn per block, every stimulus compared against it.
    Fixed,
    /// Compare against the stimulus K positions earlier.
    KBack,
}

/// Stages of a run, in their fixed order. Test stages repeat for the
/// configured number of blocks before the program moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    FixedPractice,
    FixedTest,
    KBackPractice,
    KBackTest,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::FixedPractice
    }
}

impl Stage {
    pub fn next(&self) -> Option<Self> {
        use Stage::*;
        Some(match self {
            FixedPractice => FixedTest,
            FixedTest => KBackPractice,
            KBackPractice => KBackTest,
            KBackTest => return None,
        })
    }

    pub fn condition(&self) -> Condition {
        match self {
            Stage::FixedPractice | Stage::FixedTest => Condition::Fixed,
            Stage::KBackPractice | Stage::KBackTest => Condition::KBack,
        }
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, Stage::FixedPractice | Stage::KBackPractice)
    }

    pub fn is_test(&self) -> bool {
        !self.is_practice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_order_is_fixed() {
        let mut stage = Stage::default();
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            [
                Stage::FixedPractice,
                Stage::FixedTest,
                Stage::KBackPractice,
                Stage::KBackTest
            ]
        );
    }

    #[test]
    fn stages_map_to_their_condition() {
        assert_eq!(Stage::FixedPractice.condition(), Condition::Fixed);
        assert_eq!(Stage::FixedTest.condition(), Condition::Fixed);
        assert_eq!(Stage::KBackPractice.condition(), Condition::KBack);
        assert_eq!(Stage::KBackTest.condition(), Condition::KBack);
        assert!(Stage::FixedPractice.is_practice());
        assert!(Stage::KBackPractice.is_practice());
        assert!(Stage::FixedTest.is_test());
        assert!(Stage::KBackTest.is_test());
    }
}
