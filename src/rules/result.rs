use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Evidence, Level};

/// The outcome of evaluating one check against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Identifier of the originating check.
    pub check_id: String,
    /// Human-readable check name.
    pub display_name: String,
    /// Name of the assessed target.
    pub target: String,
    pub status: Status,
    /// Rendered message (the check's template with evidence filled in).
    pub message: String,
    pub help_link: Option<String>,
    /// Facts inspected while evaluating.
    #[serde(default, skip_serializing_if = "Evidence::is_empty")]
    pub evidence: Evidence,
    /// Why the check was skipped, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl AssessmentResult {
    pub fn is_issue(&self) -> bool {
        matches!(
            self.status,
            Status::Information | Status::Warning | Status::Error
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The check's condition held.
    Pass,
    Information,
    Warning,
    Error,
    /// The check could not be evaluated.
    Skipped,
}

impl From<Level> for Status {
    fn from(level: Level) -> Self {
        match level {
            Level::Information => Self::Information,
            Level::Warning => Self::Warning,
            Level::Error => Self::Error,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Information => write!(f, "information"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
