//! Repository for the `vaults` table.

use runforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::vault::Vault;

const COLUMNS: &str = "\
    id, name, description, password_enc, vars_file_path, created_at, updated_at";

/// Read access to credential vaults. Decryption happens in the caller via
/// `runforge_core::crypto::SecretCipher`; this layer only moves ciphertext.
pub struct VaultRepo;

impl VaultRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Vault>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM vaults WHERE id = $1");
        sqlx::query_as::<_, Vault>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
