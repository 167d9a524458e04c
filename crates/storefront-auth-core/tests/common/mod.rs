//! Common test utilities for storefront-auth-core integration tests

pub mod jwks_mock;

#[allow(unused_imports)]
pub use jwks_mock::{
    default_jwks, ec_jwk, rsa_jwk, JwksMockServer, TestCognitoClaims, TestKeyPair, TEST_KEY_ID,
};
