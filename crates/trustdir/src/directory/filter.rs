//! Search filters.
//!
//! Filters are built as values and rendered to the RFC 4515 string form only
//! at the edge. Every assertion value is escaped on rendering, so a caller
//! supplied key such as `*)(cn=*` can never widen a query.

use std::fmt;

use super::Entry;

/// A search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality { attr: String, value: String },
    Present(String),
}

impl Filter {
    /// `(attr=value)`
    pub fn equals(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equality {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// `(attr=*)`
    pub fn present(attr: impl Into<String>) -> Self {
        Filter::Present(attr.into())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Evaluate against an entry. Equality is case-insensitive, matching the
    /// `caseIgnoreMatch` rule used by the trust schema attributes.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
            Filter::Equality { attr, value } => entry.has_value(attr, value),
            Filter::Present(attr) => !entry.values(attr).is_empty(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equality { attr, value } => {
                write!(f, "({attr}={})", ldap3::ldap_escape(value.as_str()))
            }
            Filter::Present(attr) => write!(f, "({attr}=*)"),
        }
    }
}
