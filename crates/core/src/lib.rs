//! Crumb Core - Shared domain types.
//!
//! This crate provides the types used by the Crumb storefront and its
//! checkout flow:
//! - `storefront` - Public-facing site with the embedded checkout wizard
//! - `integration-tests` - End-to-end HTTP tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP,
//! no async runtime. This keeps it lightweight and trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, and card numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
