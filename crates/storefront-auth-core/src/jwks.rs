//! Signing key sets fetched from a JWKS discovery endpoint
//!
//! The [`KeySetCache`] owns every [`SigningKeySet`] the process has fetched,
//! keyed by issuer. Population is single-flight: concurrent callers that miss
//! the cache wait on one fetch instead of each issuing their own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{KeySetError, RejectionReason};

/// JWKS (JSON Web Key Set) document.
///
/// Entries are kept as raw JSON so one malformed key cannot fail the whole
/// document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<serde_json::Value>,
}

/// Individual JWK (JSON Web Key)
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    // RSA
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    // EC
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

/// Why a JWK could not become a [`SigningKey`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyConversionError {
    #[error("key is not a signing key (use = {0})")]
    NotForSigning(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("unsupported algorithm {alg} for key type {kty}")]
    UnsupportedAlgorithm { kty: String, alg: String },

    #[error("missing key parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),
}

/// A public key ready to verify signatures
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Convert a JWK into a verification key.
    ///
    /// The algorithm follows the key type: RSA keys use `alg` when it names an
    /// RSA algorithm (default RS256), EC keys take it from the curve.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyConversionError> {
        if let Some(key_use) = jwk.key_use.as_deref() {
            if key_use != "sig" {
                return Err(KeyConversionError::NotForSigning(key_use.to_string()));
            }
        }

        let (algorithm, decoding_key) = match jwk.kty.as_str() {
            "RSA" => {
                let algorithm = match jwk.alg.as_deref() {
                    None | Some("RS256") => Algorithm::RS256,
                    Some("RS384") => Algorithm::RS384,
                    Some("RS512") => Algorithm::RS512,
                    Some("PS256") => Algorithm::PS256,
                    Some("PS384") => Algorithm::PS384,
                    Some("PS512") => Algorithm::PS512,
                    Some(other) => {
                        return Err(KeyConversionError::UnsupportedAlgorithm {
                            kty: jwk.kty.clone(),
                            alg: other.to_string(),
                        })
                    }
                };
                let n = jwk.n.as_deref().ok_or(KeyConversionError::MissingParameter("n"))?;
                let e = jwk.e.as_deref().ok_or(KeyConversionError::MissingParameter("e"))?;
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| KeyConversionError::InvalidParameters(err.to_string()))?;
                (algorithm, key)
            }
            "EC" => {
                let crv = jwk
                    .crv
                    .as_deref()
                    .ok_or(KeyConversionError::MissingParameter("crv"))?;
                let algorithm = match crv {
                    "P-256" => Algorithm::ES256,
                    "P-384" => Algorithm::ES384,
                    other => {
                        return Err(KeyConversionError::UnsupportedAlgorithm {
                            kty: jwk.kty.clone(),
                            alg: other.to_string(),
                        })
                    }
                };
                if let Some(alg) = jwk.alg.as_deref() {
                    if alg != algorithm_name(algorithm) {
                        return Err(KeyConversionError::UnsupportedAlgorithm {
                            kty: jwk.kty.clone(),
                            alg: alg.to_string(),
                        });
                    }
                }
                let x = jwk.x.as_deref().ok_or(KeyConversionError::MissingParameter("x"))?;
                let y = jwk.y.as_deref().ok_or(KeyConversionError::MissingParameter("y"))?;
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|err| KeyConversionError::InvalidParameters(err.to_string()))?;
                (algorithm, key)
            }
            other => return Err(KeyConversionError::UnsupportedKeyType(other.to_string())),
        };

        Ok(Self {
            kid: jwk.kid.clone(),
            algorithm,
            decoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        _ => "",
    }
}

/// Immutable `kid -> key` map built from one fetched document
#[derive(Debug)]
pub struct SigningKeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Instant,
}

impl SigningKeySet {
    /// Build a key set, skipping entries that are not usable signing keys
    pub fn from_jwks(jwks: &Jwks) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for entry in &jwks.keys {
            let jwk = match serde_json::from_value::<Jwk>(entry.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable JWKS entry");
                    continue;
                }
            };

            match SigningKey::from_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(jwk.kid.clone(), Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, error = %e, "Skipping unusable JWKS key");
                }
            }
        }

        Self {
            keys,
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, kid: &str) -> Option<&Arc<SigningKey>> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Known key IDs, in no particular order
    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Time since the document was fetched
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Where key-set documents come from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch and parse the key-set document at `url`
    async fn fetch(&self, url: &str) -> Result<Jwks, KeySetError>;
}

/// Fetches key sets over HTTPS
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpKeySetSource {
    /// Create a source with a client tuned for low-latency JWKS fetches
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2) // JWKS is typically one host
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, timeout }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self, url: &str) -> Result<Jwks, KeySetError> {
        tracing::debug!("Fetching JWKS from {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Jwks>(&body).map_err(|e| KeySetError::Parse(e.to_string()))
    }
}

/// Process-wide cache of signing key sets, keyed by issuer
#[derive(Clone)]
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    sets: Cache<String, Arc<SigningKeySet>>,
    min_refresh_interval: Duration,
    refresh_lock: Arc<Mutex<()>>,
}

impl KeySetCache {
    /// Create a cache whose entries live for `ttl`.
    ///
    /// `min_refresh_interval` bounds how often an unknown `kid` may force a
    /// refetch (see [`KeySetCache::refresh_if_stale`]).
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration, min_refresh_interval: Duration) -> Self {
        Self {
            source,
            sets: Cache::builder().time_to_live(ttl).max_capacity(16).build(),
            min_refresh_interval,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the key set for `issuer`, fetching it from `url` on a miss.
    ///
    /// Concurrent misses share a single fetch. Failures are not cached.
    pub async fn get(&self, issuer: &str, url: &str) -> Result<Arc<SigningKeySet>, RejectionReason> {
        self.sets
            .try_get_with(issuer.to_string(), self.load(url))
            .await
            .map_err(|e: Arc<KeySetError>| RejectionReason::KeySetUnavailable(e.to_string()))
    }

    /// Refetch the key set if the cached one is old enough.
    ///
    /// Returns `Ok(None)` when `stale` is younger than the refresh interval.
    /// If another caller already replaced `stale`, that newer set is returned
    /// without a second fetch. A failed refetch leaves `stale` cached.
    pub async fn refresh_if_stale(
        &self,
        issuer: &str,
        url: &str,
        stale: &Arc<SigningKeySet>,
    ) -> Result<Option<Arc<SigningKeySet>>, RejectionReason> {
        if stale.age() < self.min_refresh_interval {
            return Ok(None);
        }

        // One refresh at a time; late arrivals reuse its result
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.sets.get(issuer).await {
            if !Arc::ptr_eq(&current, stale) {
                return Ok(Some(current));
            }
        }

        // The held set stays in place unless the refetch succeeds
        let fresh = self
            .load(url)
            .await
            .map_err(|e| RejectionReason::KeySetUnavailable(e.to_string()))?;
        self.sets.insert(issuer.to_string(), Arc::clone(&fresh)).await;
        Ok(Some(fresh))
    }

    /// Drop every cached key set; the next lookup refetches
    pub fn invalidate_all(&self) {
        self.sets.invalidate_all();
    }

    async fn load(&self, url: &str) -> Result<Arc<SigningKeySet>, KeySetError> {
        let jwks = match self.source.fetch(url).await {
            Ok(jwks) => jwks,
            Err(e) => {
                tracing::error!(url, error = %e, "Failed to fetch JWKS");
                metrics::counter!("storefront_jwks_fetches_total", "status" => "error").increment(1);
                return Err(e);
            }
        };

        let set = SigningKeySet::from_jwks(&jwks);
        if set.is_empty() {
            tracing::warn!(url, entries = jwks.keys.len(), "Key set has no usable signing keys");
        } else {
            let kids: Vec<&str> = set.kids().collect();
            tracing::info!(url, keys = set.len(), ?kids, "Loaded signing key set");
        }
        metrics::counter!("storefront_jwks_fetches_total", "status" => "ok").increment(1);

        Ok(Arc::new(set))
    }
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("entries", &self.sets.entry_count())
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish_non_exhaustive()
    }
}
