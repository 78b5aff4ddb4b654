//! Password database backend facade.
//!
//! [`PassdbBackend`] is the capability surface a consumer sees: accounts,
//! domain information and trusted domains. [`IpaSam`] implements it for an
//! IPA directory by composing a [`TrustStore`] with an [`IpaAccountBackend`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use zeroize::Zeroizing;

use crate::account::{
    AccountAugmenter, AccountBackend, AccountRecord, IpaAccountBackend, PasswordRotator,
};
use crate::config::DirectoryLayout;
use crate::directory::DirectoryClient;
use crate::error::{Result, StoreError};
use crate::sid::DomSid;
use crate::trust::{TrustStore, TrustSummary, TrustedDomain};

/// Capability bits reported by [`PassdbBackend::capabilities`].
pub mod capabilities {
    /// The backend allocates and stores RIDs itself.
    pub const STORE_RIDS: u32 = 0x0001;
    /// The backend serves an Active Directory compatible domain.
    pub const ADS: u32 = 0x0002;
    /// The backend stores full trusted-domain records.
    pub const TRUSTED_DOMAINS_EX: u32 = 0x0004;
}

/// Identity of the local domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    /// NetBIOS domain name.
    pub name: String,
    /// DNS domain, lowercase.
    pub dns_domain: String,
    /// DNS forest root, lowercase.
    pub dns_forest: String,
    pub sid: DomSid,
}

/// Shared secret of a legacy (password-only) trust.
#[derive(Clone)]
pub struct TrustPassword {
    pub password: Zeroizing<String>,
    pub sid: DomSid,
    /// Seconds since the Unix epoch.
    pub last_set_time: i64,
}

impl fmt::Debug for TrustPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustPassword")
            .field("password", &"<redacted>")
            .field("sid", &self.sid)
            .field("last_set_time", &self.last_set_time)
            .finish()
    }
}

/// Everything a password database backend can be asked to do.
///
/// The legacy trust-password methods default to `Unsupported`; backends that
/// store full trusted-domain records leave them that way.
pub trait PassdbBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Bitmask of [`capabilities`] flags.
    fn capabilities(&self) -> u32;

    fn domain_info(&self) -> Result<DomainInfo>;

    fn add_account(&self, account: &AccountRecord) -> Result<()>;
    fn update_account(&self, account: &AccountRecord) -> Result<()>;

    fn get_trusted_domain(&self, key: &str) -> Result<TrustedDomain>;
    fn get_trusted_domain_by_sid(&self, sid: &DomSid) -> Result<TrustedDomain>;
    fn set_trusted_domain(&self, key: &str, record: &TrustedDomain) -> Result<()>;
    fn delete_trusted_domain(&self, key: &str) -> Result<()>;
    fn enum_trusted_domains(&self) -> Result<Vec<TrustedDomain>>;
    fn enum_trust_summaries(&self) -> Result<Vec<TrustSummary>>;

    fn get_trust_password(&self, domain: &str) -> Result<TrustPassword> {
        Err(StoreError::Unsupported(format!(
            "{}: trust password for {domain}",
            self.name()
        )))
    }

    fn set_trust_password(&self, domain: &str, _password: &str, _sid: &DomSid) -> Result<()> {
        Err(StoreError::Unsupported(format!(
            "{}: set trust password for {domain}",
            self.name()
        )))
    }

    fn delete_trust_password(&self, domain: &str) -> Result<()> {
        Err(StoreError::Unsupported(format!(
            "{}: delete trust password for {domain}",
            self.name()
        )))
    }

    fn has_capability(&self, flag: u32) -> bool {
        self.capabilities() & flag == flag
    }
}

/// What a backend constructor receives.
#[derive(Debug, Clone)]
pub struct BackendContext {
    pub directory: Arc<dyn DirectoryClient>,
    pub layout: DirectoryLayout,
    /// Generic account backend the IPA extensions wrap.
    pub base: Arc<dyn AccountBackend>,
}

/// IPA flavour of the directory-backed password database.
#[derive(Debug, Clone)]
pub struct IpaSam {
    name: String,
    layout: DirectoryLayout,
    trusts: TrustStore,
    accounts: IpaAccountBackend,
}

impl IpaSam {
    /// Build the backend.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the layout is incomplete.
    pub fn new(ctx: BackendContext) -> Result<Self> {
        ctx.layout.validate()?;
        let trusts = TrustStore::new(ctx.directory.clone(), ctx.layout.domain_dn.clone());
        let accounts = IpaAccountBackend::new(
            ctx.base,
            AccountAugmenter::new(ctx.directory.clone(), ctx.layout.clone()),
            PasswordRotator::new(ctx.directory, ctx.layout.clone()),
        );
        Ok(Self {
            name: "IPA_ldapsam".to_string(),
            layout: ctx.layout,
            trusts,
            accounts,
        })
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trusts
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }
}

impl PassdbBackend for IpaSam {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> u32 {
        capabilities::STORE_RIDS | capabilities::ADS | capabilities::TRUSTED_DOMAINS_EX
    }

    fn domain_info(&self) -> Result<DomainInfo> {
        let sid = self.layout.domain_sid.clone().ok_or_else(|| {
            StoreError::Config(format!("no domain SID configured for {}", self.layout.domain_dn))
        })?;
        let dns_domain = self.layout.realm.to_lowercase();
        Ok(DomainInfo {
            name: self.layout.domain_name.clone(),
            dns_forest: dns_domain.clone(),
            dns_domain,
            sid,
        })
    }

    fn add_account(&self, account: &AccountRecord) -> Result<()> {
        self.accounts.add_account(account)
    }

    fn update_account(&self, account: &AccountRecord) -> Result<()> {
        self.accounts.update_account(account)
    }

    fn get_trusted_domain(&self, key: &str) -> Result<TrustedDomain> {
        self.trusts.get(key)
    }

    fn get_trusted_domain_by_sid(&self, sid: &DomSid) -> Result<TrustedDomain> {
        self.trusts.get_by_sid(sid)
    }

    fn set_trusted_domain(&self, key: &str, record: &TrustedDomain) -> Result<()> {
        self.trusts.upsert(key, record)
    }

    fn delete_trusted_domain(&self, key: &str) -> Result<()> {
        self.trusts.delete(key)
    }

    fn enum_trusted_domains(&self) -> Result<Vec<TrustedDomain>> {
        self.trusts.list_all()
    }

    fn enum_trust_summaries(&self) -> Result<Vec<TrustSummary>> {
        self.trusts.list_summaries()
    }
}
