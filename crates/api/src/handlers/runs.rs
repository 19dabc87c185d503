//! Handlers for the `/runs` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Run creation is
//! asynchronous: the request is acknowledged with `202 Accepted` and the
//! script executes in the background while clients follow the live stream.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use runforge_core::error::CoreError;
use runforge_core::types::DbId;
use runforge_core::vars::{VariableMap, VariableSpec};
use runforge_db::models::{AuditActor, JobDefinition, RunListQuery, SubmitRun};
use runforge_db::repositories::{AuditRepo, JobDefinitionRepo, RunRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Acknowledgement payload for an accepted run.
#[derive(Debug, Serialize)]
pub struct RunAccepted {
    pub run_id: DbId,
    pub status: String,
}

/// Fetch a job definition by id, mapping absence to 404.
pub(crate) async fn find_definition(
    pool: &sqlx::PgPool,
    id: DbId,
) -> AppResult<JobDefinition> {
    JobDefinitionRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job definition",
            id,
        }))
}

/// The effective variables for a run of `definition`: field defaults with
/// `overrides` applied on top.
pub(crate) async fn definition_variables(
    pool: &sqlx::PgPool,
    definition: &JobDefinition,
    overrides: &VariableMap,
) -> AppResult<VariableMap> {
    let fields = JobDefinitionRepo::fields(pool, definition.id).await?;
    let specs: Vec<VariableSpec> = fields.iter().map(|f| f.to_spec()).collect();
    Ok(runforge_core::vars::merged(&specs, overrides))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/runs
///
/// Launch a run of a job definition. Returns 202 with the new run id while
/// the script executes in the background; follow `/runs/{id}/stream` for
/// live output.
pub async fn submit_run(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitRun>,
) -> AppResult<impl IntoResponse> {
    let definition = find_definition(&state.pool, input.job_definition_id).await?;
    let variables = definition_variables(&state.pool, &definition, &input.variables).await?;

    let run = state
        .launcher
        .submit(&definition, variables, input.host_id, input.batch_id)
        .await?;

    tracing::info!(
        run_id = run.id,
        job_definition_id = definition.id,
        user_id = auth.user_id,
        "Run submitted",
    );
    AuditRepo::record(&state.pool, AuditActor::User(auth.user_id), "create", "run", run.id).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id: run.id,
            status: run.status,
        }),
    ))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/runs
///
/// List runs newest-first. Supports `limit` and `offset` query parameters;
/// the total row count is returned in the `X-Total-Count` header so clients
/// can paginate.
pub async fn list_runs(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RunListQuery>,
) -> AppResult<impl IntoResponse> {
    let runs = RunRepo::list(&state.pool, &params).await?;
    let total = RunRepo::count(&state.pool).await?;

    Ok((
        [("x-total-count", total.to_string())],
        Json(DataResponse { data: runs }),
    ))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/runs/{id}
///
/// Get a single run by id, including its accumulated output.
pub async fn get_run(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let run = RunRepo::find_by_id(&state.pool, run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Run",
            id: run_id,
        }))?;

    Ok(Json(DataResponse { data: run }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/runs/{id}/cancel
///
/// Stop following a live run's output. The remote process is not killed;
/// the run is marked failed once the executor observes the cancellation.
/// Returns 204 if the run was live, 404 if it was not.
pub async fn cancel_run(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.registry.cancel(run_id).await {
        return Err(AppError::NotFound("run not in progress".into()));
    }

    tracing::info!(run_id, user_id = auth.user_id, "Run cancelled");
    AuditRepo::record(&state.pool, AuditActor::User(auth.user_id), "cancel", "run", run_id).await;

    Ok(StatusCode::NO_CONTENT)
}
