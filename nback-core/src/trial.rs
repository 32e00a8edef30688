use serde::{Deserialize, Serialize};

use crate::key::{KeyBindings, KeyCode, Response};
use crate::stage::Stage;
use crate::stimulus::Stimulus;

/// Everything needed to score one trial, derived from block state on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialContext<S> {
    /// 0-based index within the current block.
    pub trial_i: usize,
    pub lag: usize,
    pub stimulus: S,
    /// The fixed target for lag 0; the stimulus `lag` positions back
    /// otherwise. `None` during the seed trials of a lagged block.
    pub target: Option<S>,
}

impl<S: Stimulus> TrialContext<S> {
    /// The first `lag` trials of a block have no target yet and are never
    /// scored.
    pub fn is_judged(&self) -> bool {
        self.trial_i >= self.lag
    }

    pub fn is_match(&self) -> bool {
        self.target.as_ref() == Some(&self.stimulus)
    }

    pub fn correct_key(&self, keys: &KeyBindings) -> KeyCode {
        if self.is_match() {
            keys.match_key
        } else {
            keys.mismatch_key
        }
    }

    /// Scores a response. Unjudged trials count as correct regardless of
    /// the key; a timeout is neither key and fails any judged trial.
    pub fn score(&self, response: Response, keys: &KeyBindings) -> bool {
        if !self.is_judged() {
            return true;
        }
        match response {
            Response::Key(key) => key == self.correct_key(keys),
            Response::Timeout => false,
        }
    }
}

/// Free-function form of [`TrialContext::score`].
pub fn evaluate<S: Stimulus>(ctx: &TrialContext<S>, response: Response, keys: &KeyBindings) -> bool {
    ctx.score(response, keys)
}

/// Recorded result per trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord<S> {
    pub block_index: usize,
    pub trial_i: usize,
    pub stage: Stage,
    pub lag: usize,
    pub stimulus: S,
    pub target: Option<S>,
    pub response: Response,
    pub correct: bool,
    /// Response budget that applied when the trial ran.
    pub deadline_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeyBindings {
        KeyBindings::default()
    }

    fn ctx(
        trial_i: usize,
        lag: usize,
        stimulus: &'static str,
        target: Option<&'static str>,
    ) -> TrialContext<&'static str> {
        TrialContext {
            trial_i,
            lag,
            stimulus,
            target,
        }
    }

    #[test]
    fn grace_period_is_always_correct() {
        let c = ctx(0, 2, "bee", None);
        assert!(!c.is_judged());
        assert!(c.score(Response::Key(KeyCode(99)), &keys()));
        assert!(c.score(Response::Timeout, &keys()));
        assert!(ctx(1, 2, "bee", None).score(Response::Timeout, &keys()));
    }

    #[test]
    fn match_requires_the_match_key() {
        let k = keys();
        let c = ctx(2, 2, "bee", Some("bee"));
        assert!(c.score(Response::Key(k.match_key), &k));
        assert!(!c.score(Response::Key(k.mismatch_key), &k));
    }

    #[test]
    fn mismatch_requires_the_mismatch_key() {
        let k = keys();
        let c = ctx(3, 2, "bee", Some("fish"));
        assert!(c.score(Response::Key(k.mismatch_key), &k));
        assert!(!c.score(Response::Key(k.match_key), &k));
    }

    #[test]
    fn timeout_fails_judged_trials() {
        let k = keys();
        assert!(!ctx(2, 2, "bee", Some("bee")).score(Response::Timeout, &k));
        assert!(!ctx(5, 0, "bee", Some("fish")).score(Response::Timeout, &k));
    }

    #[test]
    fn unknown_key_is_never_correct() {
        let k = keys();
        assert!(!ctx(2, 0, "bee", Some("bee")).score(Response::Key(KeyCode(13)), &k));
        assert!(!ctx(2, 0, "bee", Some("pig")).score(Response::Key(KeyCode(13)), &k));
    }

    #[test]
    fn correct_key_follows_the_match() {
        let k = keys();
        assert_eq!(ctx(4, 0, "bee", Some("bee")).correct_key(&k), k.match_key);
        assert_eq!(ctx(4, 0, "bee", Some("pig")).correct_key(&k), k.mismatch_key);
        // no target yet: keyed as a mismatch, though never scored
        assert_eq!(ctx(0, 2, "bee", None).correct_key(&k), k.mismatch_key);
    }

    #[test]
    fn evaluate_matches_the_method() {
        let k = keys();
        let c = ctx(2, 2, "bee", Some("bee"));
        assert_eq!(
            evaluate(&c, Response::Key(k.match_key), &k),
            c.score(Response::Key(k.match_key), &k)
        );
        assert_eq!(
            evaluate(&c, Response::Timeout, &k),
            c.score(Response::Timeout, &k)
        );
    }
}
