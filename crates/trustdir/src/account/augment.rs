//! IPA identity attributes added to freshly created accounts.

use std::sync::Arc;

use crate::config::DirectoryLayout;
use crate::directory::{DirectoryClient, Modification};
use crate::dn;
use crate::error::{Result, StoreError};

use super::AccountRecord;

/// Group every augmented account is placed in.
pub const DEFAULT_GID_NUMBER: &str = "12345";
/// Home directory of augmented accounts; they are never interactive.
pub const DEFAULT_HOME_DIRECTORY: &str = "/dev/null";

/// Adds Kerberos principal, host and POSIX attributes to an account entry
/// the base backend has just created.
#[derive(Debug, Clone)]
pub struct AccountAugmenter {
    directory: Arc<dyn DirectoryClient>,
    layout: DirectoryLayout,
}

impl AccountAugmenter {
    pub fn new(directory: Arc<dyn DirectoryClient>, layout: DirectoryLayout) -> Self {
        Self { directory, layout }
    }

    /// The Add operations for `account`, in the order they are sent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the account has no domain.
    pub fn modifications(&self, account: &AccountRecord) -> Result<Vec<Modification>> {
        let domain = account.domain.as_deref().ok_or_else(|| {
            StoreError::InvalidArgument(format!("account {} has no domain", account.username))
        })?;
        let user = account.username.as_str();
        let principal = format!("{user}@{}", self.layout.realm);

        Ok(vec![
            Modification::add("objectClass", "krbPrincipal"),
            Modification::add("krbPrincipalName", principal),
            Modification::add("objectClass", "krbPrincipalAux"),
            Modification::add("objectClass", "ipaHost"),
            Modification::add("fqdn", domain),
            Modification::add("objectClass", "posixAccount"),
            Modification::add("cn", user),
            Modification::add("gidNumber", DEFAULT_GID_NUMBER),
            Modification::add("homeDirectory", DEFAULT_HOME_DIRECTORY),
            Modification::add("uid", domain),
            Modification::add("uid", format!("{domain}.")),
        ])
    }

    /// Apply [`modifications`](Self::modifications) to the account entry in
    /// one modify call.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` for an account without a name or
    /// domain, or `StoreError::StoreUnavailable` if the modify fails.
    pub fn augment(&self, account: &AccountRecord) -> Result<()> {
        let dn = dn::account_dn(&self.layout, &account.username)?;
        let mods = self.modifications(account)?;

        self.directory.modify(&dn, &mods).map_err(|e| {
            log::warn!(
                "failed to add IPA attributes to account {} ({dn}): {e}",
                account.username
            );
            StoreError::unavailable("modify", dn.clone(), e)
        })?;
        log::debug!("added IPA attributes to {dn}");
        Ok(())
    }
}
