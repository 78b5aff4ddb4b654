//! Directory collaborator interface.
//!
//! trustdir never speaks the directory wire protocol itself. Everything it
//! needs from a directory server is expressed by [`DirectoryClient`]:
//! subtree search with a typed filter, add, modify, delete, and a generic
//! extended operation. Connection setup, binding, and timeouts belong to
//! the implementation behind the trait.
//!
//! # Modules
//!
//! - [`filter`]: typed search filters rendered as RFC 4515 strings.
//! - [`memory`]: in-process [`DirectoryClient`] used by tests and the CLI.

pub mod filter;
pub mod memory;

pub use filter::Filter;
pub use memory::{ExtendedRequest, MemoryDirectory, OperationCounts};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Result codes ──────────────────────────────────────────────────────────────

/// Directory operation result code (RFC 4511 numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultCode(pub u32);

impl ResultCode {
    pub const SUCCESS: Self = Self(0);
    pub const OPERATIONS_ERROR: Self = Self(1);
    pub const PROTOCOL_ERROR: Self = Self(2);
    pub const ATTRIBUTE_OR_VALUE_EXISTS: Self = Self(20);
    pub const NO_SUCH_ATTRIBUTE: Self = Self(16);
    pub const NO_SUCH_OBJECT: Self = Self(32);
    pub const INVALID_DN_SYNTAX: Self = Self(34);
    pub const INSUFFICIENT_ACCESS_RIGHTS: Self = Self(50);
    pub const BUSY: Self = Self(51);
    pub const UNAVAILABLE: Self = Self(52);
    pub const UNWILLING_TO_PERFORM: Self = Self(53);
    pub const OBJECT_CLASS_VIOLATION: Self = Self(65);
    pub const NOT_ALLOWED_ON_NON_LEAF: Self = Self(66);
    pub const ENTRY_ALREADY_EXISTS: Self = Self(68);
    pub const OTHER: Self = Self(80);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Symbolic name of well-known codes.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "success",
            1 => "operationsError",
            2 => "protocolError",
            16 => "noSuchAttribute",
            20 => "attributeOrValueExists",
            32 => "noSuchObject",
            34 => "invalidDNSyntax",
            50 => "insufficientAccessRights",
            51 => "busy",
            52 => "unavailable",
            53 => "unwillingToPerform",
            65 => "objectClassViolation",
            66 => "notAllowedOnNonLeaf",
            68 => "entryAlreadyExists",
            80 => "other",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// A non-success directory result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DirectoryError {
    pub code: ResultCode,
    pub message: String,
}

impl DirectoryError {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_such_object(dn: &str) -> Self {
        Self::new(ResultCode::NO_SUCH_OBJECT, format!("no such object: {dn}"))
    }
}

/// Result alias for raw directory calls.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

// ── Requests and entries ──────────────────────────────────────────────────────

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

/// A directory entry: its DN plus multi-valued attributes.
///
/// Attribute names are matched case-insensitively, as directory schemas
/// treat them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    pub dn: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Append a value, builder style.
    pub fn with(mut self, attr: &str, value: impl Into<String>) -> Self {
        self.push(attr, value);
        self
    }

    /// Append a value to `attr`, reusing an existing differently-cased key.
    pub fn push(&mut self, attr: &str, value: impl Into<String>) {
        let value = value.into();
        match self.key_of(attr) {
            Some(key) => {
                if let Some(values) = self.attributes.get_mut(&key) {
                    values.push(value);
                }
            }
            None => {
                self.attributes.insert(attr.to_string(), vec![value]);
            }
        }
    }

    /// All values of `attr`; empty if the attribute is absent.
    pub fn values(&self, attr: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attr))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of `attr`, the way single-valued attributes are read.
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.values(attr).first().map(String::as_str)
    }

    /// Case-insensitive value test.
    pub fn has_value(&self, attr: &str, value: &str) -> bool {
        self.values(attr)
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Stored spelling of `attr`, if present.
    pub(crate) fn key_of(&self, attr: &str) -> Option<String> {
        self.attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(attr))
            .cloned()
    }
}

/// Modification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Replace,
    Delete,
}

/// One attribute change inside a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub op: ModOp,
    pub attr: String,
    pub values: Vec<String>,
}

impl Modification {
    pub fn add(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: ModOp::Add,
            attr: attr.into(),
            values: vec![value.into()],
        }
    }

    pub fn replace(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: ModOp::Replace,
            attr: attr.into(),
            values: vec![value.into()],
        }
    }

    pub fn delete(attr: impl Into<String>) -> Self {
        Self {
            op: ModOp::Delete,
            attr: attr.into(),
            values: Vec::new(),
        }
    }
}

/// Response to an extended operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedResponse {
    pub name: Option<String>,
    pub value: Option<Vec<u8>>,
}

// ── Client trait ──────────────────────────────────────────────────────────────

/// Blocking directory client.
///
/// Every method is one round-trip. Implementations must be shareable across
/// threads; trustdir keeps no per-call state of its own.
pub trait DirectoryClient: Send + Sync + fmt::Debug {
    /// Search under `base`. A missing base is reported as
    /// [`ResultCode::NO_SUCH_OBJECT`], not as an empty result.
    fn search(&self, base: &str, scope: Scope, filter: &Filter) -> DirectoryResult<Vec<Entry>>;

    /// Create `entry`. Fails with [`ResultCode::ENTRY_ALREADY_EXISTS`] if the
    /// DN is taken.
    fn add(&self, entry: &Entry) -> DirectoryResult<()>;

    /// Apply `mods` to the entry at `dn`, atomically.
    fn modify(&self, dn: &str, mods: &[Modification]) -> DirectoryResult<()>;

    /// Remove the leaf entry at `dn`.
    fn delete(&self, dn: &str) -> DirectoryResult<()>;

    /// Submit a generic extended operation identified by `oid`.
    fn extended(&self, oid: &str, value: &[u8]) -> DirectoryResult<ExtendedResponse>;
}
