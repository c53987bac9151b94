//! Validation State Evaluation
//!
//! Decides whether the calculation engine is currently validated:
//! - Source tree content hashing
//! - Runtime/dependency fingerprinting and diffing
//! - Expiry and reminder arithmetic
//! - Combined status evaluation

pub mod compare;
pub mod expiry;
pub mod fingerprint;
pub mod hash;
mod status;

pub use compare::{compare, Comparison};
pub use expiry::{check_expiry, reminder_due, ExpiryCheck};
pub use fingerprint::{CommandProbe, EnvironmentFingerprinter, StaticProbe, VersionProbe};
pub use hash::HashEngine;
pub use status::ValidationStatusEngine;
