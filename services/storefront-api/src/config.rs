//! Configuration for the Storefront API service.

use std::time::Duration;

use storefront_auth_core::AuthConfig;

/// Storefront API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Token verifier configuration
    pub auth: AuthConfig,

    /// Request timeout
    pub request_timeout: Duration,

    /// Bound of the product event queue
    pub event_queue_capacity: usize,

    /// How often expired audit records and upload slots are swept
    pub expiry_sweep_interval: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Server
        let http_port = parse_or(&var, "HTTP_PORT", 8080)?;
        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;

        // Cognito configuration
        let cognito_pool_id =
            var("COGNITO_USER_POOL_ID").ok_or(ConfigError::Missing("COGNITO_USER_POOL_ID"))?;

        let cognito_region = var("COGNITO_REGION")
            .or_else(|| var("AWS_REGION"))
            .ok_or(ConfigError::Missing("COGNITO_REGION"))?;

        let mut auth = AuthConfig::try_new(cognito_pool_id, cognito_region)?
            .with_jwks_cache_duration(Duration::from_secs(parse_or(&var, "JWKS_CACHE_SECS", 3600)?))
            .with_jwks_min_refresh_interval(Duration::from_secs(parse_or(
                &var,
                "JWKS_MIN_REFRESH_SECS",
                300,
            )?))
            .with_jwks_fetch_timeout(Duration::from_secs(parse_or(
                &var,
                "JWKS_FETCH_TIMEOUT_SECS",
                5,
            )?))
            .with_leeway(Duration::from_secs(parse_or(&var, "TOKEN_LEEWAY_SECS", 0)?));

        if let Some(client_id) = var("COGNITO_CLIENT_ID").filter(|id| !id.is_empty()) {
            auth = auth.with_client_id(client_id);
        }
        if let Some(url) = var("JWKS_URL").filter(|url| !url.is_empty()) {
            auth = auth.with_jwks_url_override(url);
        }

        // Events
        let event_queue_capacity: usize = parse_or(&var, "EVENT_QUEUE_CAPACITY", 1024)?;
        if event_queue_capacity == 0 {
            return Err(ConfigError::Invalid("EVENT_QUEUE_CAPACITY"));
        }

        let sweep_secs: u64 = parse_or(&var, "EXPIRY_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid("EXPIRY_SWEEP_INTERVAL_SECS"));
        }

        // Metrics
        let metrics_enabled: bool = parse_or(&var, "METRICS_ENABLED", true)?;

        Ok(Self {
            http_port,
            auth,
            request_timeout: Duration::from_secs(request_timeout_secs),
            event_queue_capacity,
            expiry_sweep_interval: Duration::from_secs(sweep_secs),
            metrics_enabled,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Auth(#[from] storefront_auth_core::ConfigError),
}
