//! Acceptance predicates: which record kinds an element will pair with.

use std::fmt;

use regex::Regex;

use crate::error::{BoardError, Result};

/// Predicate over a record's kind name.
#[derive(Clone, Default)]
pub enum Acceptance {
    /// Any kind.
    #[default]
    Any,
    /// Exactly this kind.
    Kind(String),
    /// Kinds matching this pattern.
    Pattern(Regex),
}

impl Acceptance {
    pub fn kind(kind: impl Into<String>) -> Self {
        Acceptance::Kind(kind.into())
    }

    /// Compile a pattern. The pattern is anchored at both ends, so
    /// `"sensor|meter"` matches neither `"sensors"` nor `"smart-meter"`.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Acceptance::Pattern)
            .map_err(|source| BoardError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn matches(&self, kind: &str) -> bool {
        match self {
            Acceptance::Any => true,
            Acceptance::Kind(k) => k == kind,
            Acceptance::Pattern(re) => re.is_match(kind),
        }
    }
}

impl fmt::Debug for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acceptance::Any => write!(f, "Any"),
            Acceptance::Kind(k) => write!(f, "Kind({k})"),
            Acceptance::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
        }
    }
}
