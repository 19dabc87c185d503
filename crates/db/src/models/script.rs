//! Script model (external-owned, read-only here).

use runforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `scripts` table. The script body lives on local disk at
/// `file_path`; the upload surface that writes it is external.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Script {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
