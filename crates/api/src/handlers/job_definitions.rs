//! Webhook token management for job definitions.
//!
//! Definitions themselves are written by the external CRUD surface; this
//! service only owns the webhook credential attached to them. A definition
//! with an empty token cannot be triggered over the webhook gateway.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rand::RngCore;
use runforge_core::error::CoreError;
use runforge_core::types::DbId;
use runforge_db::models::AuditActor;
use runforge_db::repositories::{AuditRepo, JobDefinitionRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Random bytes per webhook token (hex-encoded to twice this length).
const WEBHOOK_TOKEN_BYTES: usize = 32;

/// Payload returned when a token is (re)generated. This is the only place
/// the token is ever serialized; definition payloads omit it.
#[derive(Debug, Serialize)]
pub struct WebhookTokenResponse {
    pub webhook_token: String,
}

fn generate_webhook_token() -> String {
    let mut bytes = [0u8; WEBHOOK_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// POST /api/job-definitions/{id}/webhook-token
///
/// Generate a fresh webhook token for the definition, invalidating any
/// previous one. Returns the new token; it is not retrievable later.
pub async fn regenerate_webhook_token(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let token = generate_webhook_token();

    let updated = JobDefinitionRepo::set_webhook_token(&state.pool, id, &token).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job definition",
            id,
        }));
    }

    tracing::info!(
        job_definition_id = id,
        user_id = auth.user_id,
        "Webhook token regenerated",
    );
    AuditRepo::record(&state.pool, AuditActor::User(auth.user_id), "update", "webhook-token", id)
        .await;

    Ok(Json(DataResponse {
        data: WebhookTokenResponse {
            webhook_token: token,
        },
    }))
}

/// DELETE /api/job-definitions/{id}/webhook-token
///
/// Revoke the definition's webhook token. Triggering is disabled until a
/// new token is generated. Returns 204.
pub async fn revoke_webhook_token(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let updated = JobDefinitionRepo::set_webhook_token(&state.pool, id, "").await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job definition",
            id,
        }));
    }

    tracing::info!(
        job_definition_id = id,
        user_id = auth.user_id,
        "Webhook token revoked",
    );
    AuditRepo::record(&state.pool, AuditActor::User(auth.user_id), "delete", "webhook-token", id)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_and_unpredictable() {
        let a = generate_webhook_token();
        let b = generate_webhook_token();

        assert_eq!(a.len(), WEBHOOK_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
