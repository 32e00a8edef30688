use nback_core::{Condition, KeyCode, Response, Stage, Stimulus, TrialContext, TrialRecord};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, TaskConfig};
use crate::deadline::{DeadlineController, DeadlineUpdate};
use crate::sequence::{self, GeneratedSequence};

/// Per-block lifecycle, cycling once per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPhase {
    AwaitingBlockStart,
    RunningBlock,
    BlockComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("a block is already running")]
    BlockInProgress,
    #[error("no block is running")]
    NoActiveBlock,
    #[error("no stimulus is awaiting a response")]
    NoActiveTrial,
    #[error("the current block is not complete")]
    BlockNotComplete,
    #[error("the run program is complete")]
    ProgramComplete,
}

/// Parameters of a freshly started block, echoed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStart<S> {
    pub stage: Stage,
    pub condition: Condition,
    pub block_index: usize,
    pub lag: usize,
    /// Response budget for every trial of this block.
    pub deadline_ms: u32,
    /// Present for fixed-matching blocks, drawn fresh per block.
    pub fixed_target: Option<S>,
    /// Total stimuli the block will serve, seed trials included.
    pub trials: usize,
    /// Matches the generator actually placed (may undershoot for lag > 0).
    pub achieved_matches: usize,
}

/// End-of-block bookkeeping, handed to the host with the last trial outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub block_index: usize,
    pub judged_trials: usize,
    /// Timeouts among judged trials only.
    pub timeouts: usize,
    pub achieved_matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub correct: bool,
    /// Present on the response that finishes the block.
    pub block_complete: Option<BlockSummary>,
}

/// Owns the run program, the current block and all mutable task state.
///
/// The host loop per block: [`start_block`](Self::start_block), then
/// [`next_stimulus`](Self::next_stimulus) / [`record_response`](Self::record_response)
/// until the block completes, then [`report_block_timeouts`](Self::report_block_timeouts)
/// with the observed count.
#[derive(Debug)]
pub struct TaskStateMachine<S, R>
where
    S: Stimulus,
    R: Rng,
{
    config: TaskConfig<S>,
    rng: R,
    deadline: DeadlineController,
    stage: Stage,
    finished: bool,
    blocks_done_in_stage: usize,
    block_phase: BlockPhase,
    block_index: usize,
    lag: usize,
    sequence: Vec<S>,
    achieved_matches: usize,
    fixed_target: Option<S>,
    drawn: usize,
    recorded: usize,
    timeouts: usize,
    records: Vec<TrialRecord<S>>,
}

impl<S, R> TaskStateMachine<S, R>
where
    S: Stimulus,
    R: Rng,
{
    /// Validates the configuration and shuffles the catalog once. The
    /// catalog order never changes again for the lifetime of the run.
    pub fn new(config: TaskConfig<S>, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut machine = Self {
            deadline: DeadlineController::new(config.deadline),
            config,
            rng,
            stage: Stage::default(),
            finished: false,
            blocks_done_in_stage: 0,
            block_phase: BlockPhase::AwaitingBlockStart,
            block_index: 0,
            lag: 0,
            sequence: Vec::new(),
            achieved_matches: 0,
            fixed_target: None,
            drawn: 0,
            recorded: 0,
            timeouts: 0,
            records: Vec::new(),
        };
        machine.config.catalog.shuffle(&mut machine.rng);
        Ok(machine)
    }

    /// Starts the next block of the run program: draws a fixed target for
    /// 0-back stages, generates the block sequence, and picks up the
    /// current response budget. Starting from `BlockComplete` skips the
    /// deadline adjustment for the finished block.
    pub fn start_block(&mut self) -> Result<BlockStart<S>, TaskError> {
        if self.finished {
            return Err(TaskError::ProgramComplete);
        }
        if self.block_phase == BlockPhase::RunningBlock {
            return Err(TaskError::BlockInProgress);
        }

        let stage = self.stage;
        let condition = stage.condition();
        let lag = match condition {
            Condition::Fixed => 0,
            Condition::KBack => self.config.kback_lag,
        };
        let fixed_target = match condition {
            Condition::Fixed => self.config.catalog.choose(&mut self.rng).cloned(),
            Condition::KBack => None,
        };

        let GeneratedSequence {
            stimuli,
            match_count,
        } = match &fixed_target {
            Some(target) => sequence::generate_fixed(
                &self.config.catalog,
                self.config.block_len,
                self.config.target_count,
                target,
                &mut self.rng,
            ),
            None => sequence::generate_lagged(
                &self.config.catalog,
                lag,
                self.config.block_len,
                self.config.target_count,
                &mut self.rng,
            ),
        };

        self.lag = lag;
        self.sequence = stimuli;
        self.achieved_matches = match_count;
        self.fixed_target = fixed_target;
        self.drawn = 0;
        self.recorded = 0;
        self.timeouts = 0;
        self.block_phase = BlockPhase::RunningBlock;

        let start = BlockStart {
            stage,
            condition,
            block_index: self.block_index,
            lag,
            deadline_ms: self.deadline.deadline_ms(),
            fixed_target: self.fixed_target.clone(),
            trials: self.sequence.len(),
            achieved_matches: match_count,
        };
        info!(
            block_index = start.block_index,
            ?stage,
            lag,
            deadline_ms = start.deadline_ms,
            matches = match_count,
            "block started"
        );
        Ok(start)
    }

    /// Advances the trial counter and serves the stimulus at the new
    /// position. `None` once the block's stimuli are exhausted, or while
    /// the previous trial still awaits its response.
    pub fn next_stimulus(&mut self) -> Option<S> {
        if self.block_phase != BlockPhase::RunningBlock || self.drawn >= self.sequence.len() {
            return None;
        }
        if self.drawn > self.recorded {
            return None;
        }
        let stimulus = self.sequence[self.drawn].clone();
        self.drawn += 1;
        debug!(trial_i = self.drawn - 1, ?stimulus, "stimulus drawn");
        Some(stimulus)
    }

    fn current_index(&self) -> Option<usize> {
        if self.block_phase != BlockPhase::RunningBlock {
            return None;
        }
        self.drawn.checked_sub(1)
    }

    /// Context of the most recently drawn trial, derived on demand.
    pub fn current_context(&self) -> Option<TrialContext<S>> {
        let trial_i = self.current_index()?;
        let stimulus = self.sequence.get(trial_i)?.clone();
        let target = if self.lag == 0 {
            self.fixed_target.clone()
        } else if trial_i >= self.lag {
            Some(self.sequence[trial_i - self.lag].clone())
        } else {
            None
        };
        Some(TrialContext {
            trial_i,
            lag: self.lag,
            stimulus,
            target,
        })
    }

    pub fn current_stimulus(&self) -> Option<S> {
        self.current_index().map(|i| self.sequence[i].clone())
    }

    pub fn current_target(&self) -> Option<S> {
        self.current_context()?.target
    }

    pub fn correct_response_key(&self) -> Option<KeyCode> {
        self.current_context()
            .map(|ctx| ctx.correct_key(&self.config.keys))
    }

    /// Scores the most recently drawn stimulus and appends its record. The
    /// response that completes the block carries the block summary, after
    /// which the block index advances and the stage program steps.
    pub fn record_response(&mut self, response: Response) -> Result<TrialOutcome, TaskError> {
        if self.block_phase != BlockPhase::RunningBlock {
            return Err(TaskError::NoActiveBlock);
        }
        if self.recorded >= self.drawn {
            return Err(TaskError::NoActiveTrial);
        }
        let ctx = self.current_context().ok_or(TaskError::NoActiveTrial)?;
        let correct = ctx.score(response, &self.config.keys);
        if ctx.is_judged() && response.is_timeout() {
            self.timeouts += 1;
        }
        self.records.push(TrialRecord {
            block_index: self.block_index,
            trial_i: ctx.trial_i,
            stage: self.stage,
            lag: ctx.lag,
            stimulus: ctx.stimulus,
            target: ctx.target,
            response,
            correct,
            deadline_ms: self.deadline.deadline_ms(),
        });
        self.recorded += 1;

        let block_complete = (self.recorded == self.sequence.len()).then(|| self.complete_block());
        Ok(TrialOutcome {
            correct,
            block_complete,
        })
    }

    fn complete_block(&mut self) -> BlockSummary {
        let summary = BlockSummary {
            block_index: self.block_index,
            judged_trials: self.config.block_len,
            timeouts: self.timeouts,
            achieved_matches: self.achieved_matches,
        };
        self.block_phase = BlockPhase::BlockComplete;
        self.block_index += 1;
        self.blocks_done_in_stage += 1;
        if self.blocks_done_in_stage >= self.stage_quota(self.stage) {
            self.blocks_done_in_stage = 0;
            match self.stage.next() {
                Some(next) => self.stage = next,
                None => self.finished = true,
            }
        }
        info!(
            block_index = summary.block_index,
            timeouts = summary.timeouts,
            "block complete"
        );
        summary
    }

    fn stage_quota(&self, stage: Stage) -> usize {
        match stage {
            Stage::FixedPractice | Stage::KBackPractice => 1,
            Stage::FixedTest => self.config.fixed_test_blocks,
            Stage::KBackTest => self.config.kback_test_blocks,
        }
    }

    /// Feeds the deadline controller with the host-observed timeout count
    /// for the block just finished and re-arms the next block.
    pub fn report_block_timeouts(&mut self, timeout_count: usize) -> Result<DeadlineUpdate, TaskError> {
        if self.block_phase != BlockPhase::BlockComplete {
            return Err(TaskError::BlockNotComplete);
        }
        let update = self.deadline.update(timeout_count, self.config.block_len);
        self.block_phase = BlockPhase::AwaitingBlockStart;
        Ok(update)
    }

    /// Stage of the running block, or of the next block to start.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn block_phase(&self) -> BlockPhase {
        self.block_phase
    }

    /// Index of the running block, or of the next block to start.
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    pub fn deadline_ms(&self) -> u32 {
        self.deadline.deadline_ms()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if self.block_phase == BlockPhase::RunningBlock {
            Some((self.drawn, self.sequence.len()))
        } else {
            None
        }
    }

    pub fn records(&self) -> &[TrialRecord<S>] {
        &self.records
    }

    pub fn config(&self) -> &TaskConfig<S> {
        &self.config
    }
}
