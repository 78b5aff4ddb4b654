//! Location resolver: DNs for trust records and accounts.
//!
//! ```text
//! <domain_dn>
//! ├── ou=system
//! │   └── cn=<trusted domain key>     sambaTrustedDomain entries
//! ├── <user_suffix>
//! │   └── uid=<user>
//! └── <machine_suffix>
//!     └── uid=<host>$
//! ```

use crate::config::DirectoryLayout;
use crate::error::{Result, StoreError};

/// Container RDN holding every trusted-domain entry.
pub const TRUST_CONTAINER: &str = "ou=system";

/// Machine account names carry this suffix.
pub const MACHINE_ACCOUNT_SUFFIX: char = '$';

/// DN of an account: `uid=<escaped name>` under the user or machine suffix.
///
/// # Errors
///
/// Returns `StoreError::InvalidArgument` for an empty name.
pub fn account_dn(layout: &DirectoryLayout, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(StoreError::InvalidArgument(
            "account name must not be empty".into(),
        ));
    }
    let suffix = if name.ends_with(MACHINE_ACCOUNT_SUFFIX) {
        &layout.machine_suffix
    } else {
        &layout.user_suffix
    };
    Ok(format!("uid={},{suffix}", escape_rdn_value(name)))
}

/// DN of the trusted-domain entry named `key`.
///
/// # Errors
///
/// Returns `StoreError::InvalidArgument` for an empty key.
pub fn trusted_domain_dn(domain_dn: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument(
            "trusted domain key must not be empty".into(),
        ));
    }
    Ok(format!(
        "cn={},{TRUST_CONTAINER},{domain_dn}",
        escape_rdn_value(key)
    ))
}

/// Search base for all trusted-domain entries.
pub fn trusted_domain_base_dn(domain_dn: &str) -> String {
    format!("{TRUST_CONTAINER},{domain_dn}")
}

/// Escape an attribute value for use inside an RDN (RFC 4514 section 2.4).
pub fn escape_rdn_value(value: &str) -> String {
    ldap3::dn_escape(value).into_owned()
}

/// Split the leading RDN off `dn` and unescape its value.
///
/// Returns `(attribute, value, parent)`; the parent is empty for a
/// single-RDN DN. Multi-valued RDNs are not split.
pub fn split_rdn(dn: &str) -> Option<(String, String, &str)> {
    let (rdn, parent) = split_first_unescaped(dn, ',');
    let (attr, raw_value) = rdn.split_once('=')?;
    let attr = attr.trim();
    if attr.is_empty() {
        return None;
    }
    Some((attr.to_string(), unescape_rdn_value(raw_value)?, parent.trim_start()))
}

/// Parent DN, or `None` for a single-RDN DN.
pub fn parent_dn(dn: &str) -> Option<&str> {
    let (_, parent) = split_first_unescaped(dn, ',');
    let parent = parent.trim_start();
    (!parent.is_empty()).then_some(parent)
}

fn split_first_unescaped(s: &str, sep: char) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            return (&s[..i], &s[i + c.len_utf8()..]);
        }
    }
    (s, "")
}

fn unescape_rdn_value(raw: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut iter = raw.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let first = iter.next()?;
        match (hex_digit(first), iter.peek().copied().and_then(hex_digit)) {
            (Some(hi), Some(lo)) => {
                iter.next();
                bytes.push(hi << 4 | lo);
            }
            _ => bytes.push(first),
        }
    }
    String::from_utf8(bytes).ok()
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
