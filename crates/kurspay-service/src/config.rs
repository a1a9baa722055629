//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use kurspay_core::{UserId, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MINUTES, PENDING_EXPIRY_DAYS};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/kurspay").
    pub data_dir: String,

    /// JWT validation base URL of the auth provider.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "kurspay").
    pub auth_audience: String,

    /// User ids that are treated as admins regardless of their stored role.
    ///
    /// New deployments start with an empty user table, so the first admins
    /// come from configuration.
    pub bootstrap_admins: Vec<UserId>,

    /// Transactional-email API URL (optional).
    pub mailer_api_url: Option<String>,

    /// Transactional-email API key (optional).
    pub mailer_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum attempts per rate-limit window.
    pub rate_limit_max_attempts: u32,

    /// Rate-limit window length in minutes.
    pub rate_limit_window_minutes: i64,

    /// Hours between scheduled expiry sweeps.
    pub sweep_interval_hours: u64,

    /// Days a pending transaction may wait before the sweeper expires it.
    pub pending_expiry_days: i64,
}

/// Mailer secrets file structure.
#[derive(Debug, Deserialize)]
struct MailerSecrets {
    api_url: String,
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (mailer_api_url, mailer_api_key) = load_mailer_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/kurspay".into()),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.kurspay.example".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "kurspay".into()),
            bootstrap_admins: std::env::var("BOOTSTRAP_ADMINS")
                .unwrap_or_default()
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect(),
            mailer_api_url,
            mailer_api_key,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            rate_limit_max_attempts: std::env::var("RATE_LIMIT_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            rate_limit_window_minutes: std::env::var("RATE_LIMIT_WINDOW_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WINDOW_MINUTES),
            sweep_interval_hours: std::env::var("SWEEP_INTERVAL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
            pending_expiry_days: std::env::var("PENDING_EXPIRY_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(PENDING_EXPIRY_DAYS),
        }
    }
}

/// Load mailer secrets from file or environment.
fn load_mailer_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/mailer.json",
        "kurspay/.secrets/mailer.json",
        "../.secrets/mailer.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<MailerSecrets>(path) {
            tracing::info!(path = %path, "Loaded mailer secrets from file");
            return (Some(secrets.api_url), Some(secrets.api_key));
        }
    }

    tracing::debug!("Mailer secrets file not found, using environment variables");
    (
        std::env::var("MAILER_API_URL").ok(),
        std::env::var("MAILER_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/kurspay".into(),
            auth_base_url: "https://auth.kurspay.example".into(),
            auth_audience: "kurspay".into(),
            bootstrap_admins: Vec::new(),
            mailer_api_url: None,
            mailer_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            rate_limit_max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_window_minutes: DEFAULT_WINDOW_MINUTES,
            sweep_interval_hours: 24,
            pending_expiry_days: PENDING_EXPIRY_DAYS,
        }
    }
}
