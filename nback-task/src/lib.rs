pub mod config;
pub mod deadline;
pub mod sequence;
pub mod state;

pub use config::{ConfigError, DeadlineConfig, TaskConfig};
pub use deadline::{DeadlineController, DeadlineUpdate};
pub use sequence::{GeneratedSequence, generate_fixed, generate_lagged, lag_matches};
pub use state::{
    BlockPhase, BlockStart, BlockSummary, TaskError, TaskStateMachine, TrialOutcome,
};
