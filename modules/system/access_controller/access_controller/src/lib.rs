//! Access controller.
//!
//! Orchestrates the PIP and the PDP for every access request: resolves the
//! session's subject, asks the PDP which contexts it needs, gathers them from
//! CAEP or static providers and returns the PDP's decision. Redirects for
//! login and UMA consent are reported as classified [`AccessError`]s.
//!
//! [`AccessError`]: access_controller_sdk::AccessError
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use module::{AccessControllerModule, init};
