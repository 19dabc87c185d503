//! Host connectivity testing.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;
use runforge_core::error::CoreError;
use runforge_core::types::DbId;
use runforge_db::models::Host;
use runforge_ssh::SshSession;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Connect timeout for probes, bounded well below the global request timeout
/// so an unreachable host still produces a `{success: false}` body.
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a connectivity probe. Probe failures are part of the payload,
/// not an HTTP error: an unreachable host is an answer, not a fault.
#[derive(Debug, Serialize)]
pub struct HostTestResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/hosts/{id}/test
///
/// Connect to the host with its stored credentials and run a trivial
/// command. Always returns 200 with `{success, message}`; only an unknown
/// host id is a 404.
pub async fn test_host(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<HostTestResponse>> {
    let host = runforge_db::repositories::HostRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Host",
            id,
        }))?;

    tracing::info!(host_id = id, user_id = auth.user_id, "Testing host connection");

    let response = match probe(&host).await {
        Ok(()) => HostTestResponse {
            success: true,
            message: "connection successful".into(),
        },
        Err(message) => HostTestResponse {
            success: false,
            message,
        },
    };

    Ok(Json(response))
}

/// Connect, authenticate, and run `echo ok` to prove the account can
/// actually execute commands. Any failure is folded into the message shown
/// to the operator.
async fn probe(host: &Host) -> Result<(), String> {
    let port = host.ssh_port().map_err(|err| err.to_string())?;
    let session = SshSession::connect_with_timeout(
        &host.address,
        port,
        &host.username,
        &host.ssh_private_key,
        PROBE_CONNECT_TIMEOUT,
    )
    .await
    .map_err(|err| err.to_string())?;

    let result = session.run_command("echo ok").await;
    let _ = session.close().await;
    result.map(|_| ()).map_err(|err| err.to_string())
}
