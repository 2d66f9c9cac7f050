//! Hierarchical coordinate matching.
//!
//! Validation paths are `/` separated, e.g. `blocks/AAA/city`. A query can
//! match a stored path exactly, or by one of the partial match types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between validation path segments.
pub const PATH_SEPARATOR: char = '/';

/// How a query path is compared against a reference path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Paths must be equal.
    #[default]
    Exact,
    /// Reference is a strict descendant of the query.
    Prefix,
    /// Reference's last segment is the query.
    Suffix,
    /// Query is an inner segment of the reference.
    Contains,
}

impl MatchType {
    /// Returns `true` for any match type other than [`MatchType::Exact`].
    pub fn is_partial(self) -> bool {
        self != Self::Exact
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::Contains => "contains",
        };
        f.write_str(s)
    }
}

/// Error returned when parsing an unknown match type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown match type: {0}")]
pub struct UnknownMatchType(pub String);

impl FromStr for MatchType {
    type Err = UnknownMatchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "exact" => Ok(Self::Exact),
            "prefix" => Ok(Self::Prefix),
            "suffix" => Ok(Self::Suffix),
            "contains" => Ok(Self::Contains),
            other => Err(UnknownMatchType(other.to_string())),
        }
    }
}

/// Options carried by queries and subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchOptions {
    #[serde(default)]
    pub match_type: MatchType,
}

impl MatchOptions {
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn prefix() -> Self {
        Self::with_type(MatchType::Prefix)
    }

    pub fn suffix() -> Self {
        Self::with_type(MatchType::Suffix)
    }

    pub fn contains() -> Self {
        Self::with_type(MatchType::Contains)
    }

    pub fn with_type(match_type: MatchType) -> Self {
        Self { match_type }
    }

    /// Returns `true` if a partial match type is set.
    pub fn is_partial(&self) -> bool {
        self.match_type.is_partial()
    }
}

/// Decides whether `reference` matches `query` under `match_type`.
///
/// Equal paths always match. Stored entries are the reference when querying
/// errors; when resolving callbacks for an incoming error the roles swap and
/// the incoming path is the reference.
pub fn path_matches(reference: &str, query: &str, match_type: MatchType) -> bool {
    if reference == query {
        return true;
    }
    match match_type {
        MatchType::Exact => false,
        MatchType::Prefix => reference
            .strip_prefix(query)
            .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR)),
        MatchType::Suffix => reference
            .strip_suffix(query)
            .is_some_and(|rest| rest.ends_with(PATH_SEPARATOR)),
        MatchType::Contains => {
            let needle = format!("{PATH_SEPARATOR}{query}{PATH_SEPARATOR}");
            reference.contains(&needle)
        }
    }
}
