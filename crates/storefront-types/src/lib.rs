//! Storefront Types - Shared domain types
//!
//! This crate contains domain types used across Storefront services:
//! - Products and their validated input
//! - Product events (queue messages) and their audit records
//! - Invoices imported from uploaded documents, and their audit records

pub mod error;
pub mod event;
pub mod invoice;
pub mod product;

pub use error::*;
pub use event::*;
pub use invoice::*;
pub use product::*;
