use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Most fields have defaults suitable for local development; `APP_SECRET`
/// and `JWT_SECRET` are required. In production, override via environment
/// variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). The live output
    /// stream is mounted outside this timeout.
    pub request_timeout_secs: u64,
    /// Symmetric secret for vault password decryption.
    pub app_secret: String,
    /// Runner binary invoked on remote hosts (default: `ansible-playbook`).
    pub script_runner: String,
    /// Remote directory scripts are uploaded into (default: `/tmp`).
    pub remote_tmp_dir: String,
    /// Per-subscriber buffered line count before frames are dropped.
    pub live_subscriber_buffer: usize,
    /// How long finished live entries stay available for replay, in seconds.
    pub live_retention_secs: u64,
    /// How often the retention sweep runs, in seconds.
    pub live_sweep_interval_secs: u64,
    /// JWT token validation configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `8080`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `APP_SECRET`               | **required**               |
    /// | `SCRIPT_RUNNER`            | `ansible-playbook`         |
    /// | `REMOTE_TMP_DIR`           | `/tmp`                     |
    /// | `LIVE_SUBSCRIBER_BUFFER`   | `512`                      |
    /// | `LIVE_RETENTION_SECS`      | `3600`                     |
    /// | `LIVE_SWEEP_INTERVAL_SECS` | `300`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let app_secret =
            std::env::var("APP_SECRET").expect("APP_SECRET must be set in the environment");
        assert!(!app_secret.is_empty(), "APP_SECRET must not be empty");

        let script_runner =
            std::env::var("SCRIPT_RUNNER").unwrap_or_else(|_| "ansible-playbook".into());

        let remote_tmp_dir = std::env::var("REMOTE_TMP_DIR").unwrap_or_else(|_| "/tmp".into());

        let live_subscriber_buffer: usize = std::env::var("LIVE_SUBSCRIBER_BUFFER")
            .unwrap_or_else(|_| "512".into())
            .parse()
            .expect("LIVE_SUBSCRIBER_BUFFER must be a valid usize");

        let live_retention_secs: u64 = std::env::var("LIVE_RETENTION_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("LIVE_RETENTION_SECS must be a valid u64");

        let live_sweep_interval_secs: u64 = std::env::var("LIVE_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("LIVE_SWEEP_INTERVAL_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            app_secret,
            script_runner,
            remote_tmp_dir,
            live_subscriber_buffer,
            live_retention_secs,
            live_sweep_interval_secs,
            jwt,
        }
    }
}
