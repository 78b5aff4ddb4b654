//! In-memory directory.
//!
//! A [`DirectoryClient`] that keeps entries in a map, for tests and for the
//! CLI's snapshot files. It follows server semantics where trustdir depends
//! on them:
//!
//! - search under a base with no entries at or below it fails with
//!   `noSuchObject`; containers are otherwise implicit, so an add does not
//!   need its parent to exist
//! - add of an existing DN fails with `entryAlreadyExists`, and the RDN
//!   attribute value is added to the entry if missing
//! - modify is atomic; adding a value that is already present fails with
//!   `attributeOrValueExists`
//! - delete of an entry with children fails with `notAllowedOnNonLeaf`
//!
//! Every call is counted, and a failure can be armed for the next call.
//!
//! Snapshot file format:
//! ```json
//! { "version": 1, "entries": [ { "dn": "...", "attributes": { "cn": ["..."] } } ] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{
    DirectoryClient, DirectoryError, DirectoryResult, Entry, ExtendedResponse, Filter, ModOp,
    Modification, ResultCode, Scope,
};
use crate::dn;
use crate::error::{Result, StoreError};

// ── File format constants ─────────────────────────────────────────────────────

const SNAPSHOT_VERSION: u32 = 1;

/// Wrapper written to disk for a snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    /// Format version number.
    version: u32,
    /// Every entry, ordered by normalized DN.
    entries: Vec<Entry>,
}

// ── Call accounting ───────────────────────────────────────────────────────────

/// Number of calls issued against the directory, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub searches: usize,
    pub adds: usize,
    pub modifies: usize,
    pub deletes: usize,
    pub extended: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.searches + self.adds + self.modifies + self.deletes + self.extended
    }
}

/// A recorded extended operation. The payload may hold a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRequest {
    pub oid: String,
    pub value: Zeroizing<Vec<u8>>,
}

// ── MemoryDirectory ───────────────────────────────────────────────────────────

/// Thread-safe in-memory [`DirectoryClient`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<String, Entry>>,
    counts: Mutex<OperationCounts>,
    extended_log: Mutex<Vec<ExtendedRequest>>,
    armed_failure: Mutex<Option<DirectoryError>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory with entries, without counting calls.
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let directory = Self::new();
        for entry in entries {
            directory.insert(entry);
        }
        directory
    }

    /// Store `entry` directly, replacing any entry at the same DN.
    ///
    /// The naming attribute value is added when missing, as `add` does.
    pub fn insert(&self, mut entry: Entry) {
        if let Some((rdn_attr, rdn_value, _)) = dn::split_rdn(&entry.dn) {
            ensure_value(&mut entry, &rdn_attr, rdn_value);
        }
        self.write_entries().insert(normalize(&entry.dn), entry);
    }

    /// Current copy of the entry at `dn`.
    pub fn entry(&self, dn: &str) -> Option<Entry> {
        self.read_entries().get(&normalize(dn)).cloned()
    }

    /// Every stored entry, ordered by normalized DN.
    pub fn entries(&self) -> Vec<Entry> {
        self.read_entries().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> OperationCounts {
        *lock(&self.counts)
    }

    pub fn reset_counts(&self) {
        *lock(&self.counts) = OperationCounts::default();
    }

    /// Extended operations received so far.
    pub fn extended_requests(&self) -> Vec<ExtendedRequest> {
        lock(&self.extended_log).clone()
    }

    /// Make the next call, whatever its kind, fail with `code`.
    pub fn fail_next(&self, code: ResultCode, message: impl Into<String>) {
        *lock(&self.armed_failure) = Some(DirectoryError::new(code, message));
    }

    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read, or
    /// `StoreError::InvalidFileFormat` for malformed or unknown-version files.
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file: SnapshotFile = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::InvalidFileFormat(format!(
                "failed to parse snapshot file {}: {e}",
                path.display()
            ))
        })?;
        if file.version != SNAPSHOT_VERSION {
            return Err(StoreError::InvalidFileFormat(format!(
                "unsupported snapshot version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(Self::with_entries(file.entries))
    }

    /// Write every entry to a snapshot file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SerializationError` if serialization fails, or
    /// `StoreError::Io` for filesystem errors.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            entries: self.entries(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json.as_bytes())?;
        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Count the call and consume an armed failure.
    fn begin(&self, count: impl FnOnce(&mut OperationCounts)) -> DirectoryResult<()> {
        count(&mut lock(&self.counts));
        match lock(&self.armed_failure).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl DirectoryClient for MemoryDirectory {
    fn search(&self, base: &str, scope: Scope, filter: &Filter) -> DirectoryResult<Vec<Entry>> {
        self.begin(|c| c.searches += 1)?;
        let base_key = normalize(base);
        let entries = self.read_entries();

        if !entries.keys().any(|dn| is_at_or_below(dn, &base_key)) {
            return Err(DirectoryError::no_such_object(base));
        }

        Ok(entries
            .iter()
            .filter(|(dn, _)| in_scope(dn, &base_key, scope))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn add(&self, entry: &Entry) -> DirectoryResult<()> {
        self.begin(|c| c.adds += 1)?;
        let (rdn_attr, rdn_value, _) = dn::split_rdn(&entry.dn).ok_or_else(|| {
            DirectoryError::new(
                ResultCode::INVALID_DN_SYNTAX,
                format!("invalid DN: {}", entry.dn),
            )
        })?;

        let key = normalize(&entry.dn);
        let mut entries = self.write_entries();
        if entries.contains_key(&key) {
            return Err(DirectoryError::new(
                ResultCode::ENTRY_ALREADY_EXISTS,
                format!("entry already exists: {}", entry.dn),
            ));
        }

        let mut stored = entry.clone();
        ensure_value(&mut stored, &rdn_attr, rdn_value);
        entries.insert(key, stored);
        Ok(())
    }

    fn modify(&self, dn: &str, mods: &[Modification]) -> DirectoryResult<()> {
        self.begin(|c| c.modifies += 1)?;
        let key = normalize(dn);
        let mut entries = self.write_entries();
        let current = entries
            .get(&key)
            .ok_or_else(|| DirectoryError::no_such_object(dn))?;

        let mut updated = current.clone();
        for m in mods {
            apply(&mut updated, m)?;
        }
        entries.insert(key, updated);
        Ok(())
    }

    fn delete(&self, dn: &str) -> DirectoryResult<()> {
        self.begin(|c| c.deletes += 1)?;
        let key = normalize(dn);
        let mut entries = self.write_entries();
        if !entries.contains_key(&key) {
            return Err(DirectoryError::no_such_object(dn));
        }
        if entries.keys().any(|other| other != &key && is_at_or_below(other, &key)) {
            return Err(DirectoryError::new(
                ResultCode::NOT_ALLOWED_ON_NON_LEAF,
                format!("entry has children: {dn}"),
            ));
        }
        entries.remove(&key);
        Ok(())
    }

    fn extended(&self, oid: &str, value: &[u8]) -> DirectoryResult<ExtendedResponse> {
        self.begin(|c| c.extended += 1)?;
        lock(&self.extended_log).push(ExtendedRequest {
            oid: oid.to_string(),
            value: Zeroizing::new(value.to_vec()),
        });
        Ok(ExtendedResponse::default())
    }
}

fn apply(entry: &mut Entry, m: &Modification) -> DirectoryResult<()> {
    let key = entry.key_of(&m.attr);
    match m.op {
        ModOp::Add => {
            for value in &m.values {
                if entry.has_value(&m.attr, value) {
                    return Err(DirectoryError::new(
                        ResultCode::ATTRIBUTE_OR_VALUE_EXISTS,
                        format!("{}: value already present", m.attr),
                    ));
                }
                entry.push(&m.attr, value.clone());
            }
        }
        ModOp::Replace => {
            if let Some(key) = key {
                entry.attributes.remove(&key);
            }
            if !m.values.is_empty() {
                entry.attributes.insert(m.attr.clone(), m.values.clone());
            }
        }
        ModOp::Delete => {
            let key = key.ok_or_else(|| {
                DirectoryError::new(
                    ResultCode::NO_SUCH_ATTRIBUTE,
                    format!("{}: no such attribute", m.attr),
                )
            })?;
            if m.values.is_empty() {
                entry.attributes.remove(&key);
            } else if let Some(values) = entry.attributes.get_mut(&key) {
                values.retain(|v| !m.values.iter().any(|d| d.eq_ignore_ascii_case(v)));
                if values.is_empty() {
                    entry.attributes.remove(&key);
                }
            }
        }
    }
    Ok(())
}

fn ensure_value(entry: &mut Entry, attr: &str, value: String) {
    if !entry.has_value(attr, &value) {
        entry.push(attr, value);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Case-folded DN with whitespace after RDN separators removed.
fn normalize(dn: &str) -> String {
    let mut out = String::with_capacity(dn.len());
    let mut escaped = false;
    let mut after_separator = false;
    for c in dn.trim().chars() {
        if after_separator && c == ' ' {
            continue;
        }
        after_separator = false;
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            after_separator = true;
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn is_at_or_below(dn: &str, base: &str) -> bool {
    dn == base || is_below(dn, base)
}

fn is_below(dn: &str, base: &str) -> bool {
    dn.len() > base.len() + 1
        && dn.ends_with(base)
        && dn[..dn.len() - base.len()].ends_with(',')
        && !dn[..dn.len() - base.len() - 1].ends_with('\\')
}

fn in_scope(dn: &str, base: &str, scope: Scope) -> bool {
    match scope {
        Scope::Base => dn == base,
        Scope::Subtree => is_at_or_below(dn, base),
        Scope::OneLevel => dn::parent_dn(dn) == Some(base),
    }
}
