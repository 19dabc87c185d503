//! Job definition models (external-owned, read-only here).

use runforge_core::types::{DbId, Timestamp};
use runforge_core::vars::VariableSpec;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `job_definitions` table.
///
/// Written by the external CRUD surface; the execution core reads it when
/// launching runs, registering schedules, and resolving webhook tokens.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobDefinition {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub script_id: DbId,
    pub host_id: Option<DbId>,
    pub host_group_id: Option<DbId>,
    pub vault_id: Option<DbId>,
    pub schedule_cron: String,
    pub schedule_enabled: bool,
    #[serde(skip_serializing)]
    pub webhook_token: String,
    pub notify_webhook: String,
    pub notify_email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobDefinition {
    /// Whether completion of a run should fire the notifier at all.
    pub fn has_notification_targets(&self) -> bool {
        !self.notify_webhook.is_empty() || !self.notify_email.is_empty()
    }
}

/// A row from the `job_definition_fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VariableField {
    pub id: DbId,
    pub job_definition_id: DbId,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub default_value: String,
    pub sort_order: i32,
}

impl VariableField {
    /// Reduce to the core's variable-building view.
    pub fn to_spec(&self) -> VariableSpec {
        VariableSpec {
            name: self.name.clone(),
            field_type: self.field_type.clone(),
            default_value: self.default_value.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
