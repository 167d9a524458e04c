//! Storefront Utils - helpers shared by the Storefront crates
//!
//! - [`retry`]: exponential backoff for operations that can fail transiently

pub mod retry;

pub use retry::{with_retry, RetryConfig, RetryableError};
