//! Run entity model and DTOs.

use runforge_core::status::RunStatus;
use runforge_core::types::{DbId, Timestamp};
use runforge_core::vars::VariableMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `runs` table.
///
/// `status` holds the raw TEXT value; use [`Run::status`] for the typed
/// view. The row is immutable once `finished_at` is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Run {
    pub id: DbId,
    pub job_definition_id: Option<DbId>,
    pub script_id: DbId,
    pub host_id: DbId,
    pub variables: serde_json::Value,
    pub status: String,
    pub output: String,
    pub batch_id: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl Run {
    /// The typed status, if the stored TEXT is a known value.
    pub fn status(&self) -> Option<RunStatus> {
        RunStatus::parse(&self.status)
    }

    /// The stored JSONB variables as a map. Rows are only ever written with
    /// an object here, so anything else collapses to empty.
    pub fn variables_map(&self) -> VariableMap {
        self.variables.as_object().cloned().unwrap_or_default()
    }
}

/// DTO for `POST /api/runs`.
#[derive(Debug, Deserialize)]
pub struct SubmitRun {
    pub job_definition_id: DbId,
    /// Variable overrides applied on top of the definition's defaults.
    #[serde(default)]
    pub variables: VariableMap,
    /// Overrides the definition's host for this run only.
    pub host_id: Option<DbId>,
    /// Opaque client-assigned grouping label, stored verbatim.
    pub batch_id: Option<String>,
}

/// Query parameters for `GET /api/runs`.
#[derive(Debug, Default, Deserialize)]
pub struct RunListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn run(status: &str) -> Run {
        Run {
            id: 9,
            job_definition_id: Some(1),
            script_id: 1,
            host_id: 1,
            variables: serde_json::json!({}),
            status: status.into(),
            output: String::new(),
            batch_id: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn typed_status_covers_known_text_only() {
        assert_eq!(run("success").status(), Some(RunStatus::Success));
        assert_eq!(run("running").status(), Some(RunStatus::Running));
        assert_eq!(run("archived").status(), None);
    }
}
