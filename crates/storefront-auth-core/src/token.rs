//! Cognito access token verification
//!
//! A token is checked in a fixed order and the first failing check decides the
//! [`RejectionReason`]:
//!
//! 1. structure and header (`kid` present)
//! 2. signing key lookup, with at most one key-set refresh for an unknown `kid`
//! 3. signature
//! 4. `exp` and `auth_time` window
//! 5. `iss`
//! 6. `token_use == "access"`
//! 7. `client_id`, when one is configured

use std::collections::HashSet;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::jwks::{HttpKeySetSource, KeySetCache, KeySetSource, SigningKey};
use crate::{AuthConfig, RejectionReason};

/// The JOSE header field the verifier reads before choosing a key
#[derive(Debug, Clone, Deserialize)]
struct TokenHeader {
    #[serde(default)]
    kid: Option<String>,
}

/// Claims carried by a Cognito access token
///
/// Every field is optional so a missing claim surfaces as the matching
/// rejection instead of a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CognitoAccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default, rename = "cognito:groups")]
    pub cognito_groups: Vec<String>,
    /// Space-separated OAuth scopes
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Identity extracted from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// `username` claim, or `sub` when the token has no username
    pub username: String,
    pub subject: Option<String>,
    pub groups: Vec<String>,
    pub scopes: Vec<String>,
    pub client_id: Option<String>,
}

impl Principal {
    /// Build the principal for claims that already passed every check
    fn from_claims(claims: CognitoAccessClaims) -> Result<Self, RejectionReason> {
        let username = claims
            .username
            .clone()
            .or_else(|| claims.sub.clone())
            .filter(|name| !name.is_empty())
            .ok_or(RejectionReason::MalformedToken)?;

        let scopes = claims
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            username,
            subject: claims.sub,
            groups: claims.cognito_groups,
            scopes,
            client_id: claims.client_id,
        })
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// True if the token carries at least one of `scopes`
    pub fn has_any_scope(&self, scopes: &[&str]) -> bool {
        scopes.iter().any(|scope| self.has_scope(scope))
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Access token verifier backed by a shared key-set cache
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct TokenVerifier {
    config: Arc<AuthConfig>,
    issuer: Arc<str>,
    jwks_url: Arc<str>,
    keys: KeySetCache,
}

impl TokenVerifier {
    /// Create a verifier that fetches keys over HTTPS
    pub fn new(config: AuthConfig) -> Self {
        let source = HttpKeySetSource::new(config.jwks_fetch_timeout);
        Self::with_source(config, Arc::new(source))
    }

    /// Create a verifier reading keys from any [`KeySetSource`]
    pub fn with_source(config: AuthConfig, source: Arc<dyn KeySetSource>) -> Self {
        let keys = KeySetCache::new(
            source,
            config.jwks_cache_duration,
            config.jwks_min_refresh_interval,
        );

        Self {
            issuer: config.cognito_issuer().into(),
            jwks_url: config.jwks_url().into(),
            config: Arc::new(config),
            keys,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Expected `iss` claim
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify a token against the current time
    pub async fn verify(&self, token: &str) -> Result<Principal, RejectionReason> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Verify a token as of `now` (seconds since epoch)
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Principal, RejectionReason> {
        let result = self.check(token, now).await;

        match &result {
            Ok(principal) => {
                tracing::debug!(username = %principal, "Token verified");
                metrics::counter!("storefront_token_verifications_total", "outcome" => "accepted")
                    .increment(1);
            }
            Err(reason) => {
                tracing::debug!(reason = reason.code(), "Token rejected: {}", reason);
                metrics::counter!("storefront_token_verifications_total", "outcome" => reason.code())
                    .increment(1);
            }
        }

        result
    }

    /// Fetch the key set ahead of the first request
    pub async fn prefetch(&self) -> Result<usize, RejectionReason> {
        let set = self.keys.get(&self.issuer, &self.jwks_url).await?;
        Ok(set.len())
    }

    /// Drop cached keys; the next verification refetches
    pub fn invalidate_cache(&self) {
        self.keys.invalidate_all();
    }

    async fn check(&self, token: &str, now: i64) -> Result<Principal, RejectionReason> {
        let header = parse_header(token)?;
        let kid = header.kid.ok_or_else(|| {
            tracing::debug!("Token missing kid");
            RejectionReason::MalformedToken
        })?;

        let key = self.resolve_key(&kid).await?;
        let claims = decode_claims(token, &key)?;
        self.check_claims(&claims, now)?;

        Principal::from_claims(claims)
    }

    /// Find the key for `kid`, refreshing the key set once if it is unknown
    async fn resolve_key(&self, kid: &str) -> Result<Arc<SigningKey>, RejectionReason> {
        let set = self.keys.get(&self.issuer, &self.jwks_url).await?;
        if let Some(key) = set.get(kid) {
            return Ok(Arc::clone(key));
        }

        match self.keys.refresh_if_stale(&self.issuer, &self.jwks_url, &set).await {
            Ok(Some(fresh)) => fresh.get(kid).cloned().ok_or_else(|| {
                tracing::debug!(kid, "Key ID not in refreshed key set");
                RejectionReason::UnknownSigningKey
            }),
            Ok(None) => {
                tracing::debug!(kid, "Unknown key ID, key set too recent to refresh");
                Err(RejectionReason::UnknownSigningKey)
            }
            Err(e) => {
                tracing::warn!(kid, error = %e, "Key set refresh failed");
                Err(RejectionReason::UnknownSigningKey)
            }
        }
    }

    fn check_claims(&self, claims: &CognitoAccessClaims, now: i64) -> Result<(), RejectionReason> {
        let leeway = i64::try_from(self.config.leeway.as_secs()).unwrap_or(i64::MAX);

        let exp = claims.exp.ok_or(RejectionReason::ExpiredOrNotYetValid)?;
        if now > exp.saturating_add(leeway) {
            return Err(RejectionReason::ExpiredOrNotYetValid);
        }
        if let Some(not_before) = claims.auth_time.or(claims.iat) {
            if now < not_before.saturating_sub(leeway) {
                return Err(RejectionReason::ExpiredOrNotYetValid);
            }
        }

        if claims.iss.as_deref() != Some(self.issuer()) {
            tracing::debug!(iss = ?claims.iss, "Issuer mismatch");
            return Err(RejectionReason::IssuerMismatch);
        }

        if claims.token_use.as_deref() != Some("access") {
            return Err(RejectionReason::WrongTokenUse);
        }

        if let Some(expected) = self.config.cognito_client_id.as_deref() {
            // Constant-time comparison for the client ID
            let matches = claims
                .client_id
                .as_deref()
                .is_some_and(|id| id.as_bytes().ct_eq(expected.as_bytes()).into());
            if !matches {
                tracing::debug!(client_id = ?claims.client_id, "Client ID mismatch");
                return Err(RejectionReason::ClientMismatch);
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// Split a compact JWS and decode its header
fn parse_header(token: &str) -> Result<TokenHeader, RejectionReason> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RejectionReason::MalformedToken);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(RejectionReason::MalformedToken);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| RejectionReason::MalformedToken)?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!("Failed to decode token header: {}", e);
        RejectionReason::MalformedToken
    })
}

/// Check the signature and deserialize the payload.
///
/// A header `alg` other than the key's algorithm fails here too.
fn decode_claims(token: &str, key: &SigningKey) -> Result<CognitoAccessClaims, RejectionReason> {
    let mut validation = Validation::new(key.algorithm());
    // Time, issuer and audience are checked in `check_claims`
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<CognitoAccessClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(kid = key.kid(), "Token validation failed: {}", e);
            RejectionReason::InvalidSignature
        })
}
