use nback_core::Stimulus;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::debug;

/// A generated block sequence plus the match count actually achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequence<S> {
    pub stimuli: Vec<S>,
    pub match_count: usize,
}

/// Repair attempts per wanted match before accepting a shortfall.
const REPAIR_CAP_PER_TARGET: usize = 50;

/// Counts positions whose stimulus equals the one `lag` positions earlier.
pub fn lag_matches<S: PartialEq>(sequence: &[S], lag: usize) -> usize {
    (lag..sequence.len())
        .filter(|&i| sequence[i] == sequence[i - lag])
        .count()
}

/// Cycle the catalog to `len` entries, then shuffle uniformly. Every
/// stimulus appears with near-even frequency. The catalog must be non-empty.
fn seed_sequence<S, R>(catalog: &[S], len: usize, rng: &mut R) -> Vec<S>
where
    S: Stimulus,
    R: Rng + ?Sized,
{
    let mut stimuli: Vec<S> = (0..len).map(|i| catalog[i % catalog.len()].clone()).collect();
    stimuli.shuffle(rng);
    stimuli
}

/// Builds a fixed-target (0-back) block of `length` stimuli holding at least
/// `target_count` occurrences of `target`, clamped to the positions
/// available. Overshoot from the shuffle is left alone, never trimmed.
pub fn generate_fixed<S, R>(
    catalog: &[S],
    length: usize,
    target_count: usize,
    target: &S,
    rng: &mut R,
) -> GeneratedSequence<S>
where
    S: Stimulus,
    R: Rng + ?Sized,
{
    let mut stimuli = seed_sequence(catalog, length, rng);

    let open: Vec<usize> = (0..stimuli.len())
        .filter(|&i| stimuli[i] != *target)
        .collect();
    let present = stimuli.len() - open.len();
    if present < target_count {
        let wanted = (target_count - present).min(open.len());
        for &i in open.choose_multiple(rng, wanted) {
            stimuli[i] = target.clone();
        }
    }

    let match_count = stimuli.iter().filter(|s| *s == target).count();
    GeneratedSequence {
        stimuli,
        match_count,
    }
}

/// Builds a lag-K block of `length + lag` stimuli, repairing toward
/// `target_count` lag-matches. A forced match can break another one, so the
/// loop recounts after every insertion and gives up after a bounded number
/// of attempts; the achieved count is reported either way.
pub fn generate_lagged<S, R>(
    catalog: &[S],
    lag: usize,
    length: usize,
    target_count: usize,
    rng: &mut R,
) -> GeneratedSequence<S>
where
    S: Stimulus,
    R: Rng + ?Sized,
{
    let mut stimuli = seed_sequence(catalog, length + lag, rng);

    let mut match_count = lag_matches(&stimuli, lag);
    if length > 0 {
        let mut attempts = REPAIR_CAP_PER_TARGET * target_count;
        while match_count < target_count && attempts > 0 {
            let i = rng.random_range(lag..stimuli.len());
            stimuli[i] = stimuli[i - lag].clone();
            match_count = lag_matches(&stimuli, lag);
            attempts -= 1;
        }
        if match_count < target_count {
            debug!(
                wanted = target_count,
                achieved = match_count,
                lag,
                "match repair gave up short of target"
            );
        }
    }

    GeneratedSequence {
        stimuli,
        match_count,
    }
}
