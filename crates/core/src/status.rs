//! Run lifecycle status values.
//!
//! Statuses are stored as TEXT in the `runs` table; [`RunStatus`] owns the
//! string mapping so the literals appear in exactly one place.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a run.
///
/// Legal transitions: `Pending` → `Running` → `Success` or `Failed`. A run
/// reaches a terminal state exactly once and is immutable afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    /// The TEXT value stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse a stored TEXT value back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "success" => Some(RunStatus::Success),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// Whether the run has finished (successfully or not).
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_mapping_round_trips() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Success,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        assert_eq!(RunStatus::parse("cancelled"), None);
        assert_eq!(RunStatus::parse(""), None);
        assert_eq!(RunStatus::parse("Pending"), None);
    }

    #[test]
    fn only_success_and_failed_are_terminal() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn serde_uses_lowercase_strings() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Success).unwrap(),
            "\"success\""
        );
        let parsed: RunStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, RunStatus::Failed);
    }
}
