use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nback_core::{KeyBindings, KeyCode, Response};
use nback_task::{TaskConfig, TaskError, TaskStateMachine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

const CATALOG: [&str; 10] = [
    "bee",
    "butterfly",
    "elephant",
    "fish",
    "lion",
    "lobster",
    "parrot",
    "pig",
    "tortoise",
    "whale",
];

/// Headless run of the adaptive n-back task with a simulated participant.
#[derive(Debug, Parser)]
#[command(name = "nback-app", version, about)]
pub struct SimOptions {
    /// RNG seed; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
    /// Judged trials per block
    #[arg(long, default_value_t = 20)]
    pub block_len: usize,
    /// Wanted matches per block
    #[arg(long, default_value_t = 7)]
    pub target_count: usize,
    /// The K of the K-back stages
    #[arg(long, default_value_t = 2)]
    pub lag: usize,
    /// Fixed-matching test blocks
    #[arg(long, default_value_t = 1)]
    pub fixed_blocks: usize,
    /// K-back test blocks
    #[arg(long, default_value_t = 2)]
    pub kback_blocks: usize,
    /// Probability the participant answers correctly when responding in time
    #[arg(long, default_value_t = 0.85)]
    pub accuracy: f64,
    /// Fastest simulated response, milliseconds
    #[arg(long, default_value_t = 900)]
    pub rt_min: u32,
    /// Slowest simulated response, milliseconds
    #[arg(long, default_value_t = 2800)]
    pub rt_max: u32,
    /// Probability of not responding at all
    #[arg(long, default_value_t = 0.02)]
    pub lapse_rate: f64,
    /// Write the trial records as JSON here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub struct Simulation {
    machine: TaskStateMachine<&'static str, StdRng>,
    responder: StdRng,
    options: SimOptions,
}

impl Simulation {
    pub fn new(options: SimOptions) -> Result<Self> {
        let seed = options.seed.unwrap_or_else(|| rand::rng().random());
        info!(seed, "simulation seed");

        let mut config = TaskConfig::new(CATALOG.to_vec());
        config.block_len = options.block_len;
        config.target_count = options.target_count;
        config.kback_lag = options.lag;
        config.fixed_test_blocks = options.fixed_blocks;
        config.kback_test_blocks = options.kback_blocks;

        let machine = TaskStateMachine::new(config, StdRng::seed_from_u64(seed))
            .context("invalid task configuration")?;
        let responder = StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
        Ok(Self {
            machine,
            responder,
            options,
        })
    }

    pub fn run(mut self) -> Result<()> {
        loop {
            let block = match self.machine.start_block() {
                Ok(block) => block,
                Err(TaskError::ProgramComplete) => break,
                Err(err) => return Err(err.into()),
            };
            info!(
                block = block.block_index,
                stage = ?block.stage,
                lag = block.lag,
                deadline_ms = block.deadline_ms,
                matches = block.achieved_matches,
                "starting block"
            );

            let keys = self.machine.config().keys;
            let mut correct = 0usize;
            let mut summary = None;
            while let Some(_stimulus) = self.machine.next_stimulus() {
                let correct_key = self
                    .machine
                    .correct_response_key()
                    .context("no trial in flight")?;
                let response = self.respond(block.deadline_ms, correct_key, keys);
                let outcome = self.machine.record_response(response)?;
                if outcome.correct {
                    correct += 1;
                }
                if let Some(block_summary) = outcome.block_complete {
                    summary = Some(block_summary);
                }
            }
            let summary = summary.context("block ended without a summary")?;

            let update = self.machine.report_block_timeouts(summary.timeouts)?;
            info!(
                block = summary.block_index,
                correct,
                trials = block.trials,
                timeouts = summary.timeouts,
                next_deadline_ms = update.deadline_ms,
                "block finished"
            );
            if update.slow_advisory {
                warn!("participant too slow, a real host would alert here");
            }
        }

        self.write_records()
    }

    /// Draws a uniform response time; anything slower than the block's
    /// deadline (or a lapse) becomes a timeout.
    fn respond(&mut self, deadline_ms: u32, correct_key: KeyCode, keys: KeyBindings) -> Response {
        if self.responder.random_bool(self.options.lapse_rate) {
            return Response::Timeout;
        }
        let rt = self
            .responder
            .random_range(self.options.rt_min..=self.options.rt_max);
        if rt > deadline_ms {
            return Response::Timeout;
        }
        let key = if self.responder.random_bool(self.options.accuracy) {
            correct_key
        } else if correct_key == keys.match_key {
            keys.mismatch_key
        } else {
            keys.match_key
        };
        Response::Key(key)
    }

    fn write_records(&self) -> Result<()> {
        let records = self.machine.records();
        let correct = records.iter().filter(|r| r.correct).count();
        info!(trials = records.len(), correct, "run complete");

        match &self.options.out {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("creating {}", path.display()))?;
                serde_json::to_writer_pretty(file, records)?;
            }
            None => {
                serde_json::to_writer_pretty(io::stdout().lock(), records)?;
                println!();
            }
        }
        Ok(())
    }
}
