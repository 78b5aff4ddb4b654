//! Security identifiers.
//!
//! A [`DomSid`] names a domain or principal. Its canonical text form is
//! `S-<revision>-<authority>-<sub1>-<sub2>...`, with the 48-bit identifier
//! authority written in decimal below 2^32 and as `0x`-prefixed hex above.
//!
//! The all-zero identifier ([`DomSid::null`]) is what an absent
//! `sambaSecurityIdentifier` decodes to. It renders as `S-0-0` and is never
//! written back to the directory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Maximum number of sub-authorities a SID may carry.
pub const MAX_SUB_AUTHORITIES: usize = 15;

/// Identifier authorities are 48 bits wide.
const MAX_ID_AUTHORITY: u64 = (1 << 48) - 1;

/// A security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomSid {
    revision: u8,
    id_authority: u64,
    sub_authorities: Vec<u32>,
}

impl DomSid {
    /// Build a SID from its parts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the authority does not fit in
    /// 48 bits or there are more than [`MAX_SUB_AUTHORITIES`] sub-authorities.
    pub fn new(revision: u8, id_authority: u64, sub_authorities: Vec<u32>) -> Result<Self> {
        if id_authority > MAX_ID_AUTHORITY {
            return Err(StoreError::InvalidArgument(format!(
                "identifier authority {id_authority} exceeds 48 bits"
            )));
        }
        if sub_authorities.len() > MAX_SUB_AUTHORITIES {
            return Err(StoreError::InvalidArgument(format!(
                "{} sub-authorities, at most {MAX_SUB_AUTHORITIES} allowed",
                sub_authorities.len()
            )));
        }
        Ok(Self {
            revision,
            id_authority,
            sub_authorities,
        })
    }

    /// The all-zero SID.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.revision == 0 && self.id_authority == 0 && self.sub_authorities.is_empty()
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn id_authority(&self) -> u64 {
        self.id_authority
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Last sub-authority (the RID for account SIDs).
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }
}

impl fmt::Display for DomSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", self.revision)?;
        if self.id_authority > u64::from(u32::MAX) {
            write!(f, "0x{:x}", self.id_authority)?;
        } else {
            write!(f, "{}", self.id_authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for DomSid {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| StoreError::DecodeError(format!("invalid SID '{s}': {why}"));

        let rest = s
            .strip_prefix("S-")
            .or_else(|| s.strip_prefix("s-"))
            .ok_or_else(|| invalid("missing S- prefix"))?;

        let mut parts = rest.split('-');

        let revision = parts
            .next()
            .filter(|p| is_decimal(p))
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| invalid("bad revision"))?;

        let authority = parts.next().ok_or_else(|| invalid("missing authority"))?;
        let id_authority = match authority
            .strip_prefix("0x")
            .or_else(|| authority.strip_prefix("0X"))
        {
            Some(hex) if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                u64::from_str_radix(hex, 16).ok()
            }
            Some(_) => None,
            None if is_decimal(authority) => authority.parse::<u64>().ok(),
            None => None,
        }
        .filter(|a| *a <= MAX_ID_AUTHORITY)
        .ok_or_else(|| invalid("bad identifier authority"))?;

        let mut sub_authorities = Vec::new();
        for part in parts {
            if sub_authorities.len() == MAX_SUB_AUTHORITIES {
                return Err(invalid("too many sub-authorities"));
            }
            let sub = Some(part)
                .filter(|p| is_decimal(p))
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| invalid("bad sub-authority"))?;
            sub_authorities.push(sub);
        }

        Ok(Self {
            revision,
            id_authority,
            sub_authorities,
        })
    }
}

impl TryFrom<String> for DomSid {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DomSid> for String {
    fn from(sid: DomSid) -> Self {
        sid.to_string()
    }
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
