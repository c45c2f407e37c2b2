//! Integration tests for the Crumb storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crumb-integration-tests
//! ```
//!
//! The tests build the real router with [`crumb_storefront::app`] and drive
//! it in-process with `tower::ServiceExt::oneshot`, so no server or network
//! is needed. Submission delay is shortened through configuration.
