use std::sync::Arc;

use runforge_live::LiveRunRegistry;

use crate::config::ServerConfig;
use crate::engine::RunLauncher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: runforge_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// In-memory registry of live run output.
    pub registry: Arc<LiveRunRegistry>,
    /// Launches runs and drives them to completion.
    pub launcher: Arc<RunLauncher>,
}
