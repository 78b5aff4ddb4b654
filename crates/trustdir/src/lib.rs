//! trustdir: Directory-backed trusted-domain store for IPA password
//! databases.
//!
//! Provides cross-realm trust records kept as `sambaTrustedDomain`
//! directory entries, lookup by name or SID, sparse upserts,
//! IPA account augmentation, password rotation through the Password
//! Modify extended operation, and a named backend registry.

pub mod account;
pub mod backend;
pub mod codec;
pub mod config;
pub mod directory;
pub mod dn;
pub mod error;
pub mod registry;
pub mod sid;
pub mod trust;

// Re-export primary types
pub use error::{Result, StoreError};
pub use sid::DomSid;
pub use trust::{TrustStore, TrustSummary, TrustedDomain};

// Re-export directory types
pub use directory::{
    DirectoryClient, DirectoryError, Entry, Filter, MemoryDirectory, Modification, ResultCode,
    Scope,
};

// Re-export account types
pub use account::{AccountBackend, AccountRecord, IpaAccountBackend, PasswordRotator};

// Re-export backend types
pub use backend::{BackendContext, DomainInfo, IpaSam, PassdbBackend};
pub use config::DirectoryLayout;
pub use registry::{BackendRegistry, IPA_BACKEND};
