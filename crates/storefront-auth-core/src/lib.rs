//! Storefront Auth Core - access token verification
//!
//! Verifies Cognito-issued access tokens against the user pool's published
//! signing keys and turns them into a [`Principal`].

pub mod config;
pub mod error;
pub mod jwks;
pub mod token;

pub use config::*;
pub use error::*;
pub use jwks::{HttpKeySetSource, Jwk, Jwks, KeySetCache, KeySetSource, SigningKey, SigningKeySet};
pub use token::*;
