//! Trusted-domain persistence.
//!
//! Stores `TrustedDomain` records as `sambaTrustedDomain` entries under the
//! trust container of the domain tree:
//!
//! ```text
//! ou=system,{domain_dn}
//! ├── cn=ad.example.org      one entry per trust
//! └── cn=CHILD
//! ```
//!
//! A record is addressed by key: its NetBIOS name, its partner DNS name, or
//! the `cn` it was created under all resolve to the same entry. It can also
//! be addressed by SID. Every call searches the directory afresh; nothing is
//! cached.

use std::sync::Arc;

use crate::directory::{DirectoryClient, Entry, Filter, Modification, ResultCode, Scope};
use crate::dn;
use crate::error::{Result, StoreError};
use crate::sid::DomSid;

use super::record::{TrustSummary, TrustedDomain};
use super::schema;

// ── Filters ───────────────────────────────────────────────────────────────────

/// `(&(objectClass=sambaTrustedDomain)(|(sambaFlatName=k)(sambaTrustPartner=k)(cn=k)))`
pub fn key_filter(key: &str) -> Filter {
    Filter::and(vec![
        Filter::equals(schema::ATTR_OBJECT_CLASS, schema::OBJECT_CLASS),
        Filter::or(vec![
            Filter::equals(schema::ATTR_FLAT_NAME, key),
            Filter::equals(schema::ATTR_TRUST_PARTNER, key),
            Filter::equals(schema::ATTR_CN, key),
        ]),
    ])
}

/// `(&(objectClass=sambaTrustedDomain)(sambaSecurityIdentifier=S-...))`
pub fn sid_filter(sid: &DomSid) -> Filter {
    Filter::and(vec![
        Filter::equals(schema::ATTR_OBJECT_CLASS, schema::OBJECT_CLASS),
        Filter::equals(schema::ATTR_SECURITY_IDENTIFIER, sid.to_string()),
    ])
}

/// `(objectClass=sambaTrustedDomain)`
pub fn all_filter() -> Filter {
    Filter::equals(schema::ATTR_OBJECT_CLASS, schema::OBJECT_CLASS)
}

// ── TrustStore ────────────────────────────────────────────────────────────────

/// Directory-backed store for `TrustedDomain` records.
///
/// Holds nothing but the directory handle and the domain root, so one store
/// can serve any number of threads.
#[derive(Debug, Clone)]
pub struct TrustStore {
    directory: Arc<dyn DirectoryClient>,
    domain_dn: String,
}

impl TrustStore {
    /// Create a store for the trust container under `domain_dn`.
    pub fn new(directory: Arc<dyn DirectoryClient>, domain_dn: impl Into<String>) -> Self {
        Self {
            directory,
            domain_dn: domain_dn.into(),
        }
    }

    /// Search base holding every trusted-domain entry.
    pub fn base_dn(&self) -> String {
        dn::trusted_domain_base_dn(&self.domain_dn)
    }

    /// DN a new record created under `key` is added at.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` for an empty key.
    pub fn entry_dn(&self, key: &str) -> Result<String> {
        dn::trusted_domain_dn(&self.domain_dn, key)
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// Run a subtree search under the trust container and expect at most one
    /// match.
    ///
    /// A missing container and an empty result both mean "absent".
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AmbiguousKey` if more than one entry matches, or
    /// `StoreError::StoreUnavailable` for any other directory failure.
    pub fn find(&self, filter: &Filter) -> Result<Option<Entry>> {
        let base = self.base_dn();
        let mut entries = match self.directory.search(&base, Scope::Subtree, filter) {
            Ok(entries) => entries,
            Err(e) if e.code == ResultCode::NO_SUCH_OBJECT => {
                log::debug!("trust container {base} does not exist");
                return Ok(None);
            }
            Err(e) => {
                log::warn!("search for {filter} under {base} failed: {e}");
                return Err(StoreError::unavailable("search", base, e));
            }
        };

        match entries.len() {
            0 => {
                log::debug!("no {} object with filter '{filter}'", schema::OBJECT_CLASS);
                Ok(None)
            }
            1 => Ok(entries.pop()),
            n => {
                log::warn!(
                    "{n} {} objects match filter '{filter}'",
                    schema::OBJECT_CLASS
                );
                Err(StoreError::AmbiguousKey(format!(
                    "{n} trusted domain entries match {filter}"
                )))
            }
        }
    }

    /// Find the entry whose NetBIOS name, partner name, or `cn` is `key`.
    pub fn find_by_key(&self, key: &str) -> Result<Option<Entry>> {
        self.find(&key_filter(key))
    }

    /// Find the entry carrying `sid`.
    pub fn find_by_sid(&self, sid: &DomSid) -> Result<Option<Entry>> {
        self.find(&sid_filter(sid))
    }

    /// Load the record addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entry matches,
    /// `StoreError::DecodeError` if the entry is malformed,
    /// `StoreError::AmbiguousKey` or `StoreError::StoreUnavailable` as for
    /// [`find`](Self::find).
    pub fn get(&self, key: &str) -> Result<TrustedDomain> {
        log::debug!("get trusted domain {key}");
        match self.find_by_key(key)? {
            Some(entry) => TrustedDomain::from_entry(&entry),
            None => Err(StoreError::NotFound(format!("trusted domain: {key}"))),
        }
    }

    /// Load the record carrying `sid`. Errors as for [`get`](Self::get).
    pub fn get_by_sid(&self, sid: &DomSid) -> Result<TrustedDomain> {
        log::debug!("get trusted domain by sid {sid}");
        match self.find_by_sid(sid)? {
            Some(entry) => TrustedDomain::from_entry(&entry),
            None => Err(StoreError::NotFound(format!(
                "trusted domain with sid: {sid}"
            ))),
        }
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Create or update the record addressed by `key`.
    ///
    /// Only set, non-zero, non-empty fields are written, so an upsert can add
    /// or change attributes but never clear one. A new entry is created at
    /// [`entry_dn`](Self::entry_dn); an existing one is modified in place.
    ///
    /// Lookup and write are separate round-trips. If another writer creates
    /// the entry in between, the add fails and the error reports
    /// [`StoreError::is_conflict`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` for an empty key (no directory
    /// call is made), `StoreError::AmbiguousKey` if the key matches several
    /// entries, or `StoreError::StoreUnavailable` if the lookup or the write
    /// fails.
    pub fn upsert(&self, key: &str, record: &TrustedDomain) -> Result<()> {
        log::debug!("set trusted domain {key}");
        let new_dn = self.entry_dn(key)?;
        let existing = self.find_by_key(key)?;
        let attrs = record.to_attributes();

        match existing {
            None => {
                let mut entry = Entry::new(new_dn)
                    .with(schema::ATTR_OBJECT_CLASS, schema::OBJECT_CLASS);
                for (attr, value) in attrs {
                    entry.push(attr, value);
                }
                self.directory.add(&entry).map_err(|e| {
                    log::warn!("error adding trusted domain {}: {e}", entry.dn);
                    StoreError::unavailable("add", entry.dn.clone(), e)
                })?;
                log::info!("added trusted domain {}", entry.dn);
            }
            Some(current) => {
                let mut mods = Vec::with_capacity(attrs.len() + 1);
                if !current.has_value(schema::ATTR_OBJECT_CLASS, schema::OBJECT_CLASS) {
                    mods.push(Modification::add(
                        schema::ATTR_OBJECT_CLASS,
                        schema::OBJECT_CLASS,
                    ));
                }
                mods.extend(
                    attrs
                        .into_iter()
                        .map(|(attr, value)| Modification::replace(attr, value)),
                );
                if mods.is_empty() {
                    log::debug!("nothing to write for trusted domain {}", current.dn);
                    return Ok(());
                }
                self.directory.modify(&current.dn, &mods).map_err(|e| {
                    log::warn!("error modifying trusted domain {}: {e}", current.dn);
                    StoreError::unavailable("modify", current.dn.clone(), e)
                })?;
                log::info!("updated trusted domain {}", current.dn);
            }
        }
        Ok(())
    }

    /// Delete the record addressed by `key`.
    ///
    /// The entry is removed at the DN the search returned, which need not be
    /// the DN [`entry_dn`](Self::entry_dn) would compute for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entry matches, or
    /// `StoreError::StoreUnavailable` if the lookup or the delete fails.
    pub fn delete(&self, key: &str) -> Result<()> {
        let entry = self
            .find_by_key(key)?
            .ok_or_else(|| StoreError::NotFound(format!("trusted domain: {key}")))?;

        self.directory.delete(&entry.dn).map_err(|e| {
            log::warn!("error deleting trusted domain {}: {e}", entry.dn);
            StoreError::unavailable("delete", entry.dn.clone(), e)
        })?;
        log::info!("deleted trusted domain {}", entry.dn);
        Ok(())
    }

    // ── Enumeration ───────────────────────────────────────────────────────────

    /// Every trusted-domain record.
    ///
    /// A missing trust container yields an empty list. The list is ordered as
    /// the directory returned it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DecodeError` if any single entry is malformed (no
    /// partial list is returned), or `StoreError::StoreUnavailable` if the
    /// search fails.
    pub fn list_all(&self) -> Result<Vec<TrustedDomain>> {
        let base = self.base_dn();
        let entries = match self.directory.search(&base, Scope::Subtree, &all_filter()) {
            Ok(entries) => entries,
            Err(e) if e.code == ResultCode::NO_SUCH_OBJECT => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::unavailable("search", base, e)),
        };

        let domains = entries
            .iter()
            .map(TrustedDomain::from_entry)
            .collect::<Result<Vec<_>>>()?;
        log::debug!("enumerated {} trusted domains", domains.len());
        Ok(domains)
    }

    /// Name and SID of every trusted domain.
    pub fn list_summaries(&self) -> Result<Vec<TrustSummary>> {
        Ok(self.list_all()?.iter().map(TrustSummary::from).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
