//! Repository for the `scripts` table.

use runforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::script::Script;

const COLUMNS: &str = "id, name, description, file_path, created_at, updated_at";

/// Read access to script records.
pub struct ScriptRepo;

impl ScriptRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Script>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scripts WHERE id = $1");
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
