//! Credential vault model (external-owned, read-only here).

use runforge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `vaults` table.
///
/// `password_enc` is the AES-256-GCM sealed secret (see
/// `runforge_core::crypto`); `vars_file_path` points at an optional
/// encrypted variables file on local disk, empty when none was uploaded.
/// Not `Serialize`: vault rows never leave the process.
#[derive(Debug, Clone, FromRow)]
pub struct Vault {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub password_enc: String,
    pub vars_file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
