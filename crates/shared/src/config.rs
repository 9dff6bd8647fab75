//! Application configuration management.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Outgoing mail configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Task processor configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations when the server starts.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    /// Upper bound for one unit of work; 0 disables the deadline.
    #[serde(default = "default_tx_timeout")]
    pub tx_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_run_migrations() -> bool {
    true
}

fn default_tx_timeout() -> u64 {
    30
}

impl DatabaseConfig {
    /// Returns the unit-of-work deadline, if one is configured.
    #[must_use]
    pub const fn tx_timeout(&self) -> Option<Duration> {
        if self.tx_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.tx_timeout_secs))
        }
    }
}

/// SMTP configuration for transactional mail.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username; empty disables authentication.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Use implicit TLS towards the relay.
    #[serde(default)]
    pub smtp_tls: bool,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Public base URL used to build verification links.
    #[serde(default = "default_verify_url_base")]
    pub verify_url_base: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_email() -> String {
    "no-reply@corebank.local".to_string()
}

fn default_from_name() -> String {
    "Corebank".to_string()
}

fn default_verify_url_base() -> String {
    "http://localhost:8080".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_tls: false,
            from_email: default_from_email(),
            from_name: default_from_name(),
            verify_url_base: default_verify_url_base(),
        }
    }
}

/// Task processor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Queue name to priority weight.
    #[serde(default = "default_queues")]
    pub queues: BTreeMap<String, u32>,
    /// How long an idle worker sleeps before polling again.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Deadline for a single handler invocation.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// How long a claimed task stays leased before it is recovered.
    #[serde(default = "default_lease")]
    pub lease_secs: u64,
    /// How long shutdown waits for in-flight handlers.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    /// First retry delay.
    #[serde(default = "default_retry_base")]
    pub retry_base_ms: u64,
    /// Retry delay ceiling.
    #[serde(default = "default_retry_max")]
    pub retry_max_ms: u64,
}

fn default_concurrency() -> usize {
    10
}

fn default_queues() -> BTreeMap<String, u32> {
    BTreeMap::from([("critical".to_string(), 10), ("default".to_string(), 5)])
}

fn default_poll_interval() -> u64 {
    1_000
}

fn default_task_timeout() -> u64 {
    30
}

fn default_lease() -> u64 {
    120
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_retry_base() -> u64 {
    1_000
}

fn default_retry_max() -> u64 {
    600_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queues: default_queues(),
            poll_interval_ms: default_poll_interval(),
            task_timeout_secs: default_task_timeout(),
            lease_secs: default_lease(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            retry_base_ms: default_retry_base(),
            retry_max_ms: default_retry_max(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("COREBANK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
