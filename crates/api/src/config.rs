use domain::services::TrackingConfig as TrackingThresholds;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// State machine thresholds
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Outbound alert bus
    #[serde(default)]
    pub publisher: PublisherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(c: &DatabaseConfig) -> Self {
        Self {
            url: c.url.clone(),
            max_connections: c.max_connections,
            min_connections: c.min_connections,
            connect_timeout_secs: c.connect_timeout_secs,
            idle_timeout_secs: c.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Radius under which an approaching vehicle triggers an alert
    #[serde(default = "default_approach_radius_km")]
    pub approach_radius_km: f64,

    /// Radius beyond which a receding vehicle releases the signal
    #[serde(default = "default_leave_radius_km")]
    pub leave_radius_km: f64,

    /// Entries in the nearest-signals snapshot (1-10)
    #[serde(default = "default_nearest_limit")]
    pub nearest_limit: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            approach_radius_km: default_approach_radius_km(),
            leave_radius_km: default_leave_radius_km(),
            nearest_limit: default_nearest_limit(),
        }
    }
}

impl TrackingConfig {
    pub fn thresholds(&self) -> TrackingThresholds {
        TrackingThresholds {
            approach_radius_km: self.approach_radius_km,
            leave_radius_km: self.leave_radius_km,
            nearest_limit: self.nearest_limit,
        }
    }
}

/// How alerts leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherMode {
    /// Log alerts only (development)
    Log,
    /// POST alerts to the broker's HTTP publish endpoint
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_publisher_mode")]
    pub mode: PublisherMode,

    /// Broker HTTP publish endpoint (required in http mode)
    #[serde(default)]
    pub url: String,

    /// Shared secret for the X-Signature header (optional)
    #[serde(default)]
    pub signing_secret: String,

    /// Topic prefix, alerts go to `{prefix}/{signal topic}`
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// MQTT quality of service requested from the bridge
    #[serde(default = "default_qos")]
    pub qos: u8,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_publisher_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Alerts buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mode: default_publisher_mode(),
            url: String::new(),
            signing_secret: String::new(),
            topic_prefix: default_topic_prefix(),
            qos: default_qos(),
            timeout_ms: default_publisher_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_approach_radius_km() -> f64 {
    domain::services::tracking::APPROACH_RADIUS_KM
}
fn default_leave_radius_km() -> f64 {
    domain::services::tracking::LEAVE_RADIUS_KM
}
fn default_nearest_limit() -> usize {
    domain::models::NEAREST_SIGNALS_LIMIT
}
fn default_publisher_mode() -> PublisherMode {
    PublisherMode::Log
}
fn default_topic_prefix() -> String {
    domain::models::DEFAULT_TOPIC_PREFIX.to_string()
}
fn default_qos() -> u8 {
    1
}
fn default_publisher_timeout_ms() -> u64 {
    2000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    100
}
fn default_queue_capacity() -> usize {
    1024
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SP__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SP").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults and overrides, without
    /// touching config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 10
            min_connections = 1
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [tracking]
            approach_radius_km = 0.5
            leave_radius_km = 0.1
            nearest_limit = 10

            [publisher]
            mode = "log"
            url = ""
            topic_prefix = "traffic"
            qos = 1
            timeout_ms = 2000
            max_retries = 3
            retry_base_delay_ms = 1
            queue_capacity = 64
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SP__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        self.validate_tracking()?;
        self.validate_publisher()
    }

    fn validate_tracking(&self) -> Result<(), ConfigValidationError> {
        let t = &self.tracking;
        let radii_valid = t.approach_radius_km.is_finite()
            && t.leave_radius_km.is_finite()
            && t.leave_radius_km >= 0.0;
        if !radii_valid {
            return Err(ConfigValidationError::InvalidValue(
                "tracking radii must be finite and non-negative".to_string(),
            ));
        }
        if t.approach_radius_km <= t.leave_radius_km {
            return Err(ConfigValidationError::InvalidValue(
                "approach_radius_km must be greater than leave_radius_km".to_string(),
            ));
        }
        if !(1..=domain::models::NEAREST_SIGNALS_LIMIT).contains(&t.nearest_limit) {
            return Err(ConfigValidationError::InvalidValue(
                "nearest_limit must be between 1 and 10".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_publisher(&self) -> Result<(), ConfigValidationError> {
        let p = &self.publisher;
        if p.mode == PublisherMode::Http && p.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SP__PUBLISHER__URL must be set when publisher mode is http".to_string(),
            ));
        }
        if p.qos > 2 {
            return Err(ConfigValidationError::InvalidValue(
                "publisher qos must be 0, 1 or 2".to_string(),
            ));
        }
        if p.queue_capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "publisher queue_capacity must be positive".to_string(),
            ));
        }
        if p.topic_prefix.trim_matches('/').is_empty() {
            return Err(ConfigValidationError::InvalidValue(
                "publisher topic_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
