//! Accounts: IPA extensions layered on a base account backend.
//!
//! [`IpaAccountBackend`] wraps any [`AccountBackend`]. It lets the base
//! create or update the account, then adds IPA identity attributes to new
//! accounts and pushes a changed password through the Password Modify
//! extended operation.

pub mod augment;
pub mod rotation;

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::Result;

pub use augment::AccountAugmenter;
pub use rotation::{passwd_modify_request, PasswordRotator, PASSWD_MODIFY_OID};

/// An account as handed to the backend for creation or update.
#[derive(Clone, Default)]
pub struct AccountRecord {
    /// Login name; machine accounts end in `$`.
    pub username: String,
    /// DNS domain of the host the account belongs to.
    pub domain: Option<String>,
    /// Plaintext password, present only when it changed in this update.
    pub new_password: Option<Zeroizing<String>>,
}

impl AccountRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_new_password(mut self, password: impl Into<String>) -> Self {
        self.new_password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn is_machine(&self) -> bool {
        self.username.ends_with(crate::dn::MACHINE_ACCOUNT_SUFFIX)
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field(
                "new_password",
                &self.new_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Generic account CRUD, implemented outside trustdir.
pub trait AccountBackend: Send + Sync + fmt::Debug {
    fn add_account(&self, account: &AccountRecord) -> Result<()>;
    fn update_account(&self, account: &AccountRecord) -> Result<()>;
}

/// Base account backend extended with IPA augmentation and password
/// rotation.
#[derive(Debug, Clone)]
pub struct IpaAccountBackend {
    base: Arc<dyn AccountBackend>,
    augmenter: AccountAugmenter,
    rotator: PasswordRotator,
}

impl IpaAccountBackend {
    pub fn new(
        base: Arc<dyn AccountBackend>,
        augmenter: AccountAugmenter,
        rotator: PasswordRotator,
    ) -> Self {
        Self {
            base,
            augmenter,
            rotator,
        }
    }

    fn rotate_if_changed(&self, account: &AccountRecord) -> Result<()> {
        match &account.new_password {
            Some(password) => self.rotator.rotate(&account.username, password),
            None => Ok(()),
        }
    }
}

impl AccountBackend for IpaAccountBackend {
    /// Base add, then augmentation, then rotation. The first failure stops
    /// the chain; earlier steps are not undone.
    fn add_account(&self, account: &AccountRecord) -> Result<()> {
        self.base.add_account(account)?;
        self.augmenter.augment(account)?;
        self.rotate_if_changed(account)
    }

    /// Base update, then rotation. Existing accounts are not re-augmented.
    fn update_account(&self, account: &AccountRecord) -> Result<()> {
        self.base.update_account(account)?;
        self.rotate_if_changed(account)
    }
}
