//! Repository for the `runs` table.
//!
//! Status transitions go through [`RunStatus`] so the TEXT literals live in
//! one place. `finish` guards on `finished_at IS NULL`: a run reaches a
//! terminal state at most once.

use runforge_core::status::RunStatus;
use runforge_core::types::DbId;
use runforge_core::vars::VariableMap;
use sqlx::PgPool;

use crate::models::run::{Run, RunListQuery};

/// Column list for `runs` queries.
const COLUMNS: &str = "\
    id, job_definition_id, script_id, host_id, variables, status, output, \
    batch_id, created_at, started_at, finished_at";

/// Maximum page size for run listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for run listing.
const DEFAULT_LIMIT: i64 = 50;

/// Persistence operations for runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert a new pending run with empty output.
    pub async fn create(
        pool: &PgPool,
        job_definition_id: Option<DbId>,
        script_id: DbId,
        host_id: DbId,
        variables: &VariableMap,
        batch_id: Option<&str>,
    ) -> Result<Run, sqlx::Error> {
        let query = format!(
            "INSERT INTO runs (job_definition_id, script_id, host_id, variables, status, batch_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(job_definition_id)
            .bind(script_id)
            .bind(host_id)
            .bind(serde_json::Value::Object(variables.clone()))
            .bind(RunStatus::Pending.as_str())
            .bind(batch_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest-first page of runs.
    pub async fn list(pool: &PgPool, query: &RunListQuery) -> Result<Vec<Run>, sqlx::Error> {
        let (limit, offset) = page(query);
        let sql = format!(
            "SELECT {COLUMNS} FROM runs ORDER BY id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Run>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM runs")
            .fetch_one(pool)
            .await
    }

    /// Transition pending → running and stamp `started_at`.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE runs SET status = $2, started_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(RunStatus::Running.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record the terminal status, full output, and `finished_at`.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        status: RunStatus,
        output: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE runs SET status = $2, output = $3, finished_at = NOW() \
             WHERE id = $1 AND finished_at IS NULL",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(output)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Resolve the effective limit/offset for a listing query.
fn page(query: &RunListQuery) -> (i64, i64) {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_caps() {
        let default = page(&RunListQuery::default());
        assert_eq!(default, (DEFAULT_LIMIT, 0));

        let capped = page(&RunListQuery {
            limit: Some(10_000),
            offset: Some(-5),
        });
        assert_eq!(capped, (MAX_LIMIT, 0));

        let explicit = page(&RunListQuery {
            limit: Some(5),
            offset: Some(20),
        });
        assert_eq!(explicit, (5, 20));
    }
}
