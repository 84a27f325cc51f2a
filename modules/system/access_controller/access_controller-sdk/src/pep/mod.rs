//! PEP (Policy Enforcement Point) helpers.
//!
//! - [`enforcer::PolicyEnforcer`] - asks the controller and maps the outcome to transport behavior

pub mod enforcer;

pub use enforcer::{PepOutcome, PolicyEnforcer};
