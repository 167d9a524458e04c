//! Configuration types for token verification

use std::time::Duration;

use crate::ConfigError;

/// Token verifier configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Cognito user pool ID (e.g., us-east-1_xxxxx)
    pub cognito_pool_id: String,
    /// AWS region (e.g., us-east-1)
    pub aws_region: String,
    /// Expected app client ID; `None` accepts tokens from any client of the pool
    pub cognito_client_id: Option<String>,
    /// How long a fetched key set stays cached
    pub jwks_cache_duration: Duration,
    /// Minimum key-set age before an unknown `kid` may trigger a refetch
    pub jwks_min_refresh_interval: Duration,
    /// Total timeout for one key-set fetch
    pub jwks_fetch_timeout: Duration,
    /// Clock skew tolerated on `exp` and `auth_time`
    pub leeway: Duration,
    /// Fetch keys from here instead of the issuer's discovery endpoint
    pub jwks_url_override: Option<String>,
}

impl AuthConfig {
    /// Create a new auth config without validating the inputs
    pub fn new(cognito_pool_id: impl Into<String>, aws_region: impl Into<String>) -> Self {
        Self {
            cognito_pool_id: cognito_pool_id.into(),
            aws_region: aws_region.into(),
            cognito_client_id: None,
            jwks_cache_duration: Duration::from_secs(60 * 60), // 1 hour
            jwks_min_refresh_interval: Duration::from_secs(5 * 60),
            jwks_fetch_timeout: Duration::from_secs(5),
            leeway: Duration::ZERO,
            jwks_url_override: None,
        }
    }

    /// Create a new auth config, rejecting a malformed region or pool ID
    pub fn try_new(
        cognito_pool_id: impl Into<String>,
        aws_region: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self::new(cognito_pool_id, aws_region);
        validate_region(&config.aws_region)?;
        validate_pool_id(&config.cognito_pool_id)?;
        Ok(config)
    }

    /// Get the Cognito issuer URL
    pub fn cognito_issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.aws_region, self.cognito_pool_id
        )
    }

    /// Get the JWKS URL
    pub fn jwks_url(&self) -> String {
        match &self.jwks_url_override {
            Some(url) => url.clone(),
            None => format!("{}/.well-known/jwks.json", self.cognito_issuer()),
        }
    }

    /// Require tokens to be issued to this app client
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.cognito_client_id = Some(client_id.into());
        self
    }

    /// Set JWKS cache duration
    pub fn with_jwks_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = duration;
        self
    }

    /// Set the cooldown between unknown-kid refetches
    pub fn with_jwks_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refresh_interval = interval;
        self
    }

    /// Set the key-set fetch timeout
    pub fn with_jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }

    /// Set clock skew leeway
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Fetch keys from a different URL (mock servers, egress proxies)
    pub fn with_jwks_url_override(mut self, url: impl Into<String>) -> Self {
        self.jwks_url_override = Some(url.into());
        self
    }
}

fn validate_region(region: &str) -> Result<(), ConfigError> {
    let well_formed = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && region.contains('-')
        && !region.starts_with('-')
        && !region.ends_with('-');

    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::InvalidRegion(region.to_string()))
    }
}

fn validate_pool_id(pool_id: &str) -> Result<(), ConfigError> {
    let well_formed = !pool_id.is_empty()
        && pool_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::InvalidPoolId(pool_id.to_string()))
    }
}
