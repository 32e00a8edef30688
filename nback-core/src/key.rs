use serde::{Deserialize, Serialize};

/// Numeric key identifier as reported by the host's input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

/// The two response keys of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub match_key: KeyCode,
    pub mismatch_key: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        // space / down arrow
        Self {
            match_key: KeyCode(32),
            mismatch_key: KeyCode(40),
        }
    }
}

/// One trial's response as delivered by the host, timeout included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Key(KeyCode),
    Timeout,
}

impl Response {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Response::Timeout)
    }
}
