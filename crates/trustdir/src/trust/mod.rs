//! Trusted domains: cross-realm trust records kept in the directory.
//!
//! The trust module provides:
//! - The `sambaTrustedDomain` schema and trust flag constants
//! - The `TrustedDomain` record and its attribute mapping
//! - A directory-backed store addressed by name or SID

pub mod record;
pub mod schema;
pub mod store;

pub use record::{TrustSummary, TrustedDomain};
pub use store::TrustStore;
