use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ViewType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Grid,
    Form,
    Tree,
    Portal,
    Calendar,
    Chart,
    Html,
}

impl ViewType {
    pub fn all() -> &'static [ViewType] {
        &[
            ViewType::Grid,
            ViewType::Form,
            ViewType::Tree,
            ViewType::Portal,
            ViewType::Calendar,
            ViewType::Chart,
            ViewType::Html,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewType::Grid => "grid",
            ViewType::Form => "form",
            ViewType::Tree => "tree",
            ViewType::Portal => "portal",
            ViewType::Calendar => "calendar",
            ViewType::Chart => "chart",
            ViewType::Html => "html",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewType {
    type Err = crate::error::ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::error::ActionError::InvalidViewType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MessageLevel
// ---------------------------------------------------------------------------

/// Severity of a validation check. The level doubles as the key of the
/// map the check produces (`{"error": "..."}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Error,
    Alert,
    Info,
    Notify,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageLevel::Error => "error",
            MessageLevel::Alert => "alert",
            MessageLevel::Info => "info",
            MessageLevel::Notify => "notify",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Where a run stopped. A failed run is reported as
/// [`Evaluation::Failed`](crate::evaluation::Evaluation::Failed) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Done,
    PausedSave,
    PausedReload,
    PausedValidate,
}

impl RunState {
    pub fn is_paused(self) -> bool {
        !matches!(self, RunState::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Done => "done",
            RunState::PausedSave => "paused_save",
            RunState::PausedReload => "paused_reload",
            RunState::PausedValidate => "paused_validate",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
