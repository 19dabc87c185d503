//! Repository for `job_definitions` and their variable fields.

use runforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::job_definition::{JobDefinition, VariableField};

/// Column list for `job_definitions` queries.
const COLUMNS: &str = "\
    id, name, description, script_id, host_id, host_group_id, vault_id, \
    schedule_cron, schedule_enabled, webhook_token, notify_webhook, \
    notify_email, created_at, updated_at";

/// Column list for `job_definition_fields` queries.
const FIELD_COLUMNS: &str =
    "id, job_definition_id, name, label, field_type, default_value, sort_order";

/// Read access to job definitions plus webhook-token maintenance.
pub struct JobDefinitionRepo;

impl JobDefinitionRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<JobDefinition>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_definitions WHERE id = $1");
        sqlx::query_as::<_, JobDefinition>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a webhook token to its definition. Revoked definitions store
    /// an empty token, which never matches.
    pub async fn find_by_webhook_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<JobDefinition>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_definitions \
             WHERE webhook_token = $1 AND webhook_token <> ''"
        );
        sqlx::query_as::<_, JobDefinition>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// The definition's variable fields in display order.
    pub async fn fields(
        pool: &PgPool,
        job_definition_id: DbId,
    ) -> Result<Vec<VariableField>, sqlx::Error> {
        let query = format!(
            "SELECT {FIELD_COLUMNS} FROM job_definition_fields \
             WHERE job_definition_id = $1 ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, VariableField>(&query)
            .bind(job_definition_id)
            .fetch_all(pool)
            .await
    }

    /// All definitions with an enabled, non-empty schedule. Used to
    /// re-register schedules at process startup.
    pub async fn list_scheduled(pool: &PgPool) -> Result<Vec<JobDefinition>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_definitions \
             WHERE schedule_enabled AND schedule_cron <> '' ORDER BY id"
        );
        sqlx::query_as::<_, JobDefinition>(&query)
            .fetch_all(pool)
            .await
    }

    /// Replace the stored webhook token (empty string revokes). Returns
    /// false when the definition does not exist.
    pub async fn set_webhook_token(
        pool: &PgPool,
        id: DbId,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_definitions SET webhook_token = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
