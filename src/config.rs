use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// State backend configuration
    #[serde(default)]
    pub state: StateConfig,

    /// Event bus configuration
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Escalation sweep configuration
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: INCIDENT_FLOW)
            .add_source(
                config::Environment::with_prefix("INCIDENT_FLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// State backend type
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the embedded database (sled)
    pub path: Option<PathBuf>,

    /// Redis connection string
    pub redis_url: Option<String>,

    /// Prefix applied to every Redis key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            path: None,
            redis_url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Memory,
    Sled,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Messaging backend
    #[serde(default)]
    pub backend: MessagingBackend,

    /// Per-topic channel capacity for the in-memory bus
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Prefix for broker subjects
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// NATS server URL
    pub nats_url: Option<String>,
}

impl MessagingConfig {
    /// Get full topic name with prefix
    pub fn full_topic(&self, topic: &str) -> String {
        format!("{}.{}", self.topic_prefix, topic)
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            backend: MessagingBackend::default(),
            channel_capacity: default_channel_capacity(),
            topic_prefix: default_topic_prefix(),
            nats_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessagingBackend {
    #[default]
    InMemory,
    Nats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Seconds an incident may stay ASSIGNED before it is escalated
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,

    /// Cron expression (with seconds) driving the sweep
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,

    /// Command buffer of the pending registry
    #[serde(default = "default_registry_buffer")]
    pub registry_buffer: usize,
}

impl EscalationConfig {
    /// `threshold_secs` as a duration, rejecting values chrono cannot hold
    pub fn threshold(&self) -> crate::error::Result<chrono::Duration> {
        i64::try_from(self.threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "escalation.threshold_secs {} is out of range",
                    self.threshold_secs
                ))
            })
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            sweep_schedule: default_sweep_schedule(),
            registry_buffer: default_registry_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_key_prefix() -> String {
    "incident-flow".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_topic_prefix() -> String {
    "incident-flow".to_string()
}

fn default_threshold_secs() -> u64 {
    10
}

fn default_sweep_schedule() -> String {
    "*/10 * * * * *".to_string()
}

fn default_registry_buffer() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "incident-flow".to_string()
}

fn default_true() -> bool {
    true
}
