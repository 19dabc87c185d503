//! Repository for the `hosts` table.

use runforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::host::Host;

const COLUMNS: &str = "\
    id, name, address, port, username, ssh_private_key, pre_command, \
    created_at, updated_at";

/// Read access to registered hosts.
pub struct HostRepo;

impl HostRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Host>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hosts WHERE id = $1");
        sqlx::query_as::<_, Host>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
