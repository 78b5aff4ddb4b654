//! Trusted-domain records and their attribute mapping.
//!
//! Every attribute of a `sambaTrustedDomain` entry is optional, so every
//! field here is an `Option`. `None` means the attribute is not stored;
//! `Some(0)` and `Some(vec![])` are representable but are written exactly
//! like `None` (the change-set is sparse).

use std::fmt;

use serde::Serialize;

use crate::codec;
use crate::directory::Entry;
use crate::error::{Result, StoreError};
use crate::sid::DomSid;

use super::schema::{self, direction};

/// One cross-realm trust relationship.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TrustedDomain {
    /// SID of the partner domain.
    pub security_identifier: Option<DomSid>,
    /// Short (NetBIOS) name of the partner domain.
    pub netbios_name: Option<String>,
    /// Fully qualified (DNS) name of the partner domain.
    pub domain_name: Option<String>,
    /// Bitmask of [`direction`] flags.
    pub trust_direction: Option<u32>,
    /// One of the [`schema::trust_type`] values.
    pub trust_type: Option<u32>,
    /// Bitmask of [`schema::attributes`] flags.
    pub trust_attributes: Option<u32>,
    /// Secret authenticating the outgoing direction.
    pub trust_auth_outgoing: Option<Vec<u8>>,
    /// Secret authenticating the incoming direction.
    pub trust_auth_incoming: Option<Vec<u8>>,
    /// Opaque forest topology blob.
    pub forest_trust_info: Option<Vec<u8>>,
}

impl TrustedDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trust_direction_or_zero(&self) -> u32 {
        self.trust_direction.unwrap_or(0)
    }

    pub fn trust_type_or_zero(&self) -> u32 {
        self.trust_type.unwrap_or(0)
    }

    pub fn trust_attributes_or_zero(&self) -> u32 {
        self.trust_attributes.unwrap_or(0)
    }

    /// Partner SID, or the null SID when unset.
    pub fn sid_or_null(&self) -> DomSid {
        self.security_identifier.clone().unwrap_or_default()
    }

    pub fn is_inbound(&self) -> bool {
        self.trust_direction_or_zero() & direction::INBOUND != 0
    }

    pub fn is_outbound(&self) -> bool {
        self.trust_direction_or_zero() & direction::OUTBOUND != 0
    }

    pub fn summary(&self) -> TrustSummary {
        TrustSummary::from(self)
    }

    /// Decode a directory entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DecodeError` if the SID or any integer attribute
    /// is malformed, or if any trust attribute holds more than one value.
    /// Malformed blobs are read as absent.
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let security_identifier = single(entry, schema::ATTR_SECURITY_IDENTIFIER)?
            .map(|raw| codec::decode_sid(Some(raw)))
            .transpose()
            .map_err(|e| in_entry(entry, schema::ATTR_SECURITY_IDENTIFIER, e))?;

        let trust_auth_incoming = blob(entry, schema::ATTR_TRUST_AUTH_INCOMING)?;
        let trust_auth_outgoing = blob(entry, schema::ATTR_TRUST_AUTH_OUTGOING)?;

        let netbios_name = single(entry, schema::ATTR_FLAT_NAME)?.map(str::to_string);
        let domain_name = single(entry, schema::ATTR_TRUST_PARTNER)?.map(str::to_string);

        let trust_direction = uint(entry, schema::ATTR_TRUST_DIRECTION)?;
        let trust_attributes = uint(entry, schema::ATTR_TRUST_ATTRIBUTES)?;
        let trust_type = uint(entry, schema::ATTR_TRUST_TYPE)?;

        let forest_trust_info = blob(entry, schema::ATTR_FOREST_TRUST_INFO)?;

        Ok(Self {
            security_identifier,
            netbios_name,
            domain_name,
            trust_direction,
            trust_type,
            trust_attributes,
            trust_auth_outgoing,
            trust_auth_incoming,
            forest_trust_info,
        })
    }

    /// Sparse attribute list for writing: unset, zero, empty and null
    /// values are left out. `objectClass` is not included.
    pub fn to_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();

        if let Some(name) = self.netbios_name.as_deref().filter(|s| !s.is_empty()) {
            attrs.push((schema::ATTR_FLAT_NAME, name.to_string()));
        }
        if let Some(name) = self.domain_name.as_deref().filter(|s| !s.is_empty()) {
            attrs.push((schema::ATTR_TRUST_PARTNER, name.to_string()));
        }
        if let Some(sid) = self.security_identifier.as_ref().filter(|s| !s.is_null()) {
            attrs.push((schema::ATTR_SECURITY_IDENTIFIER, sid.to_string()));
        }

        let numbers = [
            (schema::ATTR_TRUST_TYPE, self.trust_type),
            (schema::ATTR_TRUST_ATTRIBUTES, self.trust_attributes),
            (schema::ATTR_TRUST_DIRECTION, self.trust_direction),
        ];
        for (attr, value) in numbers {
            if let Some(v) = value.filter(|v| *v != 0) {
                attrs.push((attr, codec::encode_u32(v)));
            }
        }

        let blobs = [
            (schema::ATTR_TRUST_AUTH_OUTGOING, &self.trust_auth_outgoing),
            (schema::ATTR_TRUST_AUTH_INCOMING, &self.trust_auth_incoming),
            (schema::ATTR_FOREST_TRUST_INFO, &self.forest_trust_info),
        ];
        for (attr, value) in blobs {
            if let Some(b) = value.as_deref().filter(|b| !b.is_empty()) {
                attrs.push((attr, codec::encode_blob(b)));
            }
        }

        attrs
    }
}

impl fmt::Debug for TrustedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |b: &Option<Vec<u8>>| b.as_ref().map(|b| format!("<{} bytes>", b.len()));
        f.debug_struct("TrustedDomain")
            .field("security_identifier", &self.security_identifier)
            .field("netbios_name", &self.netbios_name)
            .field("domain_name", &self.domain_name)
            .field("trust_direction", &self.trust_direction)
            .field("trust_type", &self.trust_type)
            .field("trust_attributes", &self.trust_attributes)
            .field("trust_auth_outgoing", &redacted(&self.trust_auth_outgoing))
            .field("trust_auth_incoming", &redacted(&self.trust_auth_incoming))
            .field(
                "forest_trust_info",
                &self.forest_trust_info.as_ref().map(Vec::len),
            )
            .finish()
    }
}

/// Name and SID of a trusted domain, for callers that need nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TrustSummary {
    /// NetBIOS name.
    pub name: Option<String>,
    /// Partner SID; the null SID when the record has none.
    pub security_identifier: DomSid,
}

impl From<&TrustedDomain> for TrustSummary {
    fn from(td: &TrustedDomain) -> Self {
        Self {
            name: td.netbios_name.clone(),
            security_identifier: td.sid_or_null(),
        }
    }
}

/// The only value of a single-valued attribute.
fn single<'a>(entry: &'a Entry, attr: &str) -> Result<Option<&'a str>> {
    match entry.values(attr) {
        [] => Ok(None),
        [value] => Ok(Some(value.as_str())),
        values => Err(StoreError::DecodeError(format!(
            "{attr} of {}: expected one value, found {}",
            entry.dn,
            values.len()
        ))),
    }
}

fn uint(entry: &Entry, attr: &str) -> Result<Option<u32>> {
    single(entry, attr)?
        .map(codec::parse_u32)
        .transpose()
        .map_err(|e| in_entry(entry, attr, e))
}

fn blob(entry: &Entry, attr: &str) -> Result<Option<Vec<u8>>> {
    Ok(single(entry, attr)?
        .map(|raw| codec::decode_blob(Some(raw)))
        .filter(|b| !b.is_empty()))
}

fn in_entry(entry: &Entry, attr: &str, err: StoreError) -> StoreError {
    match err {
        StoreError::DecodeError(msg) => {
            StoreError::DecodeError(format!("{attr} of {}: {msg}", entry.dn))
        }
        other => other,
    }
}
