//! Directory layout configuration.
//!
//! Everything trustdir needs to know about where entries live. Loaded from a
//! JSON file:
//!
//! ```json
//! {
//!     "domain_dn": "dc=example,dc=com",
//!     "user_suffix": "cn=users,cn=accounts,dc=example,dc=com",
//!     "machine_suffix": "cn=computers,cn=accounts,dc=example,dc=com",
//!     "realm": "EXAMPLE.COM",
//!     "domain_name": "EXAMPLE",
//!     "domain_sid": "S-1-5-21-1-2-3"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::sid::DomSid;

/// Where accounts and trust records live, and the local domain's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLayout {
    /// Root of the domain tree. Trust records live under `ou=system,<domain_dn>`.
    pub domain_dn: String,
    /// Container for user accounts.
    pub user_suffix: String,
    /// Container for machine accounts (names ending in `$`).
    pub machine_suffix: String,
    /// Kerberos realm, upper case by convention.
    pub realm: String,
    /// NetBIOS name of the local domain.
    pub domain_name: String,
    /// SID of the local domain, if known.
    #[serde(default)]
    pub domain_sid: Option<DomSid>,
}

impl DirectoryLayout {
    /// Standard IPA layout under `domain_dn`.
    ///
    /// The NetBIOS domain name defaults to the first realm label.
    pub fn new(domain_dn: impl Into<String>, realm: impl Into<String>) -> Self {
        let domain_dn = domain_dn.into();
        let realm = realm.into();
        let domain_name = realm
            .split('.')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        Self {
            user_suffix: format!("cn=users,cn=accounts,{domain_dn}"),
            machine_suffix: format!("cn=computers,cn=accounts,{domain_dn}"),
            domain_dn,
            realm,
            domain_name,
            domain_sid: None,
        }
    }

    pub fn with_domain_name(mut self, name: impl Into<String>) -> Self {
        self.domain_name = name.into();
        self
    }

    pub fn with_domain_sid(mut self, sid: DomSid) -> Self {
        self.domain_sid = Some(sid);
        self
    }

    /// Load and validate a layout from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read,
    /// `StoreError::InvalidFileFormat` if it is not valid JSON for this
    /// structure, or `StoreError::Config` if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let layout: Self = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::InvalidFileFormat(format!(
                "failed to parse layout file {}: {e}",
                path.display()
            ))
        })?;
        layout.validate()?;
        Ok(layout)
    }

    /// Reject layouts that cannot produce valid DNs.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("domain_dn", &self.domain_dn),
            ("user_suffix", &self.user_suffix),
            ("machine_suffix", &self.machine_suffix),
            ("realm", &self.realm),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}
