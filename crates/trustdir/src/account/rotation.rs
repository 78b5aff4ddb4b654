//! Credential rotation through the Password Modify extended operation
//! (RFC 3062).
//!
//! ```text
//! PasswdModifyRequestValue ::= SEQUENCE {
//!     userIdentity [0] OCTET STRING OPTIONAL,
//!     oldPasswd    [1] OCTET STRING OPTIONAL,
//!     newPasswd    [2] OCTET STRING OPTIONAL }
//! ```
//!
//! Only `userIdentity` and `newPasswd` are sent; the old password is never
//! required because the bound identity is trusted to reset secrets.

use std::sync::Arc;

use ldap3::exop::{Exop, PasswordModify};
use zeroize::Zeroizing;

use crate::config::DirectoryLayout;
use crate::directory::DirectoryClient;
use crate::dn;
use crate::error::{Result, StoreError};

/// Object identifier of the Password Modify extended operation.
pub const PASSWD_MODIFY_OID: &str = "1.3.6.1.4.1.4203.1.11.1";

/// Encode the request value for `dn` and `secret`.
///
/// The encoded value is moved into a buffer that is wiped on drop.
pub fn passwd_modify_request(dn: &str, secret: &str) -> Zeroizing<Vec<u8>> {
    let exop: Exop = PasswordModify {
        user_id: Some(dn),
        old_pass: None,
        new_pass: Some(secret),
    }
    .into();
    Zeroizing::new(exop.val.unwrap_or_default())
}

/// Submits password changes for accounts in one directory layout.
#[derive(Debug, Clone)]
pub struct PasswordRotator {
    directory: Arc<dyn DirectoryClient>,
    layout: DirectoryLayout,
}

impl PasswordRotator {
    pub fn new(directory: Arc<dyn DirectoryClient>, layout: DirectoryLayout) -> Self {
        Self { directory, layout }
    }

    /// Set a new secret for `account_name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` for an empty secret or account
    /// name (no directory call is made), or `StoreError::RotationFailed` if
    /// the directory rejects the operation.
    pub fn rotate(&self, account_name: &str, new_secret: &str) -> Result<()> {
        if new_secret.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "empty password for {account_name}"
            )));
        }
        let dn = dn::account_dn(&self.layout, account_name)?;
        let request = passwd_modify_request(&dn, new_secret);

        match self.directory.extended(PASSWD_MODIFY_OID, &request) {
            Ok(_) => {
                log::info!("password changed for {dn}");
                Ok(())
            }
            Err(e) => {
                log::warn!("password modify for {dn} failed: {e}");
                Err(StoreError::RotationFailed { dn, source: e })
            }
        }
    }
}
