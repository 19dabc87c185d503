//! Repository for the `audit_logs` table.

use runforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::AuditActor;

/// Write access to the audit trail.
///
/// Recording is best-effort: a failed insert is logged at warn level and
/// the audited operation proceeds unaffected.
pub struct AuditRepo;

impl AuditRepo {
    /// Record one audited operation.
    pub async fn record(
        pool: &PgPool,
        actor: AuditActor,
        action: &str,
        resource: &str,
        resource_id: DbId,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_logs (actor, action, resource, resource_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(actor.to_string())
        .bind(action)
        .bind(resource)
        .bind(resource_id)
        .execute(pool)
        .await;

        if let Err(err) = result {
            tracing::warn!(
                %actor,
                action,
                resource,
                resource_id,
                error = %err,
                "Failed to record audit entry"
            );
        }
    }
}
