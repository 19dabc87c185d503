use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runforge_api::config::ServerConfig;
use runforge_api::engine::{ExecSettings, RunLauncher, RunTrigger};
use runforge_api::router::build_app_router;
use runforge_api::scheduler::{register_startup_schedules, Scheduler};
use runforge_api::{background, state};
use runforge_live::{EmailConfig, LiveRunRegistry, Notifier};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "runforge_api=debug,runforge_ssh=debug,runforge_live=debug,runforge_db=debug,tower_http=debug"
            .into()
    });
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = runforge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    runforge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    runforge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Live run registry ---
    let registry = Arc::new(LiveRunRegistry::with_subscriber_capacity(
        config.live_subscriber_buffer,
    ));

    // --- Notifier ---
    let email = EmailConfig::from_env();
    if email.is_none() {
        tracing::info!("SMTP not configured, email notifications disabled");
    }
    let notifier = Arc::new(Notifier::new(email));

    // --- Run launcher ---
    let launcher = Arc::new(RunLauncher::new(
        pool.clone(),
        Arc::clone(&registry),
        notifier,
        ExecSettings {
            script_runner: config.script_runner.clone(),
            remote_tmp_dir: config.remote_tmp_dir.clone(),
            app_secret: config.app_secret.clone(),
        },
    ));

    // --- Scheduler ---
    let trigger: Arc<dyn RunTrigger> = launcher.clone();
    let scheduler = Arc::new(Scheduler::new(trigger));
    let registered = register_startup_schedules(&scheduler, &pool)
        .await
        .expect("Failed to register schedules at startup");
    tracing::info!(registered, "Schedules registered");

    // --- Registry sweep ---
    let sweep_cancel = tokio_util::sync::CancellationToken::new();
    let sweep_handle = tokio::spawn(background::registry_sweep::run(
        Arc::clone(&registry),
        Duration::from_secs(config.live_retention_secs),
        Duration::from_secs(config.live_sweep_interval_secs),
        sweep_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
        launcher: Arc::clone(&launcher),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop schedule timers so nothing new fires during teardown.
    scheduler.shutdown().await;

    // Stop the registry sweep.
    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Registry sweep stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
