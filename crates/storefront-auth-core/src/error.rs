//! Verification errors

use storefront_utils::RetryableError;
use thiserror::Error;

/// Why a token was rejected.
///
/// Every variant is a terminal answer for the current call. Only
/// [`RejectionReason::KeySetUnavailable`] reflects a transient condition and
/// may be retried by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Not three non-empty dot-separated sections, or an unreadable header
    #[error("malformed token")]
    MalformedToken,

    /// The signing keys could not be fetched or parsed
    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// Header `kid` is not in the key set
    #[error("unknown signing key")]
    UnknownSigningKey,

    /// Signature, algorithm or payload did not verify
    #[error("invalid signature")]
    InvalidSignature,

    /// Outside the `auth_time`..`exp` window
    #[error("token expired or not yet valid")]
    ExpiredOrNotYetValid,

    /// `iss` is not the configured issuer
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// `token_use` is not `access`
    #[error("wrong token use")]
    WrongTokenUse,

    /// `client_id` is not the configured app client
    #[error("client mismatch")]
    ClientMismatch,
}

impl RejectionReason {
    /// Whether the caller may retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeySetUnavailable(_))
    }

    /// Stable reason code for logs, metrics and audit
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::KeySetUnavailable(_) => "KEY_SET_UNAVAILABLE",
            Self::UnknownSigningKey => "UNKNOWN_SIGNING_KEY",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ExpiredOrNotYetValid => "EXPIRED_OR_NOT_YET_VALID",
            Self::IssuerMismatch => "ISSUER_MISMATCH",
            Self::WrongTokenUse => "WRONG_TOKEN_USE",
            Self::ClientMismatch => "CLIENT_MISMATCH",
        }
    }
}

impl RetryableError for RejectionReason {
    fn is_retryable(&self) -> bool {
        RejectionReason::is_retryable(self)
    }
}

/// Failure fetching or parsing a key-set document
#[derive(Error, Debug)]
pub enum KeySetError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("discovery endpoint returned status {0}")]
    Status(u16),

    #[error("invalid key set document: {0}")]
    Parse(String),
}

impl From<KeySetError> for RejectionReason {
    fn from(err: KeySetError) -> Self {
        Self::KeySetUnavailable(err.to_string())
    }
}

/// Invalid verifier configuration, reported at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid AWS region: {0:?}")]
    InvalidRegion(String),

    #[error("invalid Cognito user pool id: {0:?}")]
    InvalidPoolId(String),
}
