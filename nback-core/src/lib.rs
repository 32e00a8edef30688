pub mod key;
pub mod stage;
pub mod stimulus;
pub mod trial;

pub use key::{KeyBindings, KeyCode, Response};
pub use stage::{Condition, Stage};
pub use stimulus::Stimulus;
pub use trial::{TrialContext, TrialRecord, evaluate};
