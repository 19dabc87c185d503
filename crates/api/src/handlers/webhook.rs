//! Inbound webhook trigger gateway.
//!
//! `POST /api/webhook/job-definitions/{token}` launches a run of the
//! definition owning `token`. The token in the path is the only credential;
//! no JWT is involved, so external systems (CI pipelines, monitoring hooks)
//! can fire jobs with a plain HTTP call. Unknown tokens get a 404 with no
//! hint of whether the definition exists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use runforge_core::vars::VariableMap;
use runforge_db::models::AuditActor;
use runforge_db::repositories::{AuditRepo, JobDefinitionRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::runs::{definition_variables, RunAccepted};
use crate::state::AppState;

/// POST /api/webhook/job-definitions/{token}
///
/// An optional JSON object body supplies variable overrides; omitting the
/// body (or sending no content type) runs with the definition's defaults.
pub async fn trigger_job_definition(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Option<Json<VariableMap>>,
) -> AppResult<impl IntoResponse> {
    let definition = JobDefinitionRepo::find_by_webhook_token(&state.pool, &token)
        .await?
        .ok_or_else(|| AppError::NotFound("invalid webhook token".into()))?;

    let overrides = body.map(|Json(map)| map).unwrap_or_default();
    let variables = definition_variables(&state.pool, &definition, &overrides).await?;

    let run = state.launcher.submit(&definition, variables, None, None).await?;

    tracing::info!(
        run_id = run.id,
        job_definition_id = definition.id,
        "Webhook-triggered run accepted",
    );
    AuditRepo::record(&state.pool, AuditActor::Webhook, "trigger", "run", run.id).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id: run.id,
            status: run.status,
        }),
    ))
}
