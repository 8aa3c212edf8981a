use serde::Serialize;
use std::fmt;

/// Construction-time engine state. Never changes afterwards: a disabled
/// engine stays disabled until the process restarts.
pub enum EngineState<E, V> {
    Ready { embedder: E, index: V },
    Disabled { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EngineStatus {
    Ready,
    Disabled { reason: String },
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Disabled { reason } => write!(f, "disabled ({reason})"),
        }
    }
}
