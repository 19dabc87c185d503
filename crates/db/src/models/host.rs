//! Host model (external-owned, read-only here).

use runforge_core::error::CoreError;
use runforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `hosts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Host {
    pub id: DbId,
    pub name: String,
    pub address: String,
    pub port: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub ssh_private_key: String,
    /// Shell fragment run before the script command (e.g. env setup).
    pub pre_command: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Host {
    /// The SSH port as a `u16`. The column is INTEGER, so a row written
    /// outside the valid port range surfaces here instead of wrapping.
    pub fn ssh_port(&self) -> Result<u16, CoreError> {
        u16::try_from(self.port).map_err(|_| {
            CoreError::Validation(format!("host {} port {} out of range", self.id, self.port))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
