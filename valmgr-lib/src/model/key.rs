//! ModelState key tokenizer.
//!
//! ## Key grammar
//!
//! ```text
//! key := "_Properties." alias ["." culture ["." segment ["." field]]]
//!      | nativeKey
//! ```
//!
//! - A literal `null` in the culture or segment position means "no value".
//! - Anything that does not start with the `_Properties` part is a native field
//!   key and is kept verbatim, even when it looks structured
//!   (`Groups[0].Properties[2].Alias`).

use std::fmt;

/// First part of every user defined property key.
pub const PROPERTIES_PREFIX: &str = "_Properties";

const NULL_LITERAL: &str = "null";

/// A tokenized ModelState key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStateKey {
    /// Error for a user defined content property.
    Property {
        alias: String,
        culture: Option<String>,
        segment: Option<String>,
        field: Option<String>,
    },
    /// Error for a native field of the edited object.
    NativeField { key: String },
}

impl ModelStateKey {
    /// Tokenizes a raw key. Never fails: unrecognized shapes are native keys.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('.');
        let is_property = parts.next() == Some(PROPERTIES_PREFIX);
        let alias = parts.next();

        match (is_property, alias) {
            (true, Some(alias)) => Self::Property {
                alias: alias.to_string(),
                culture: nullable(parts.next()),
                segment: nullable(parts.next()),
                field: parts.next().filter(|f| !f.is_empty()).map(str::to_string),
            },
            _ => Self::NativeField {
                key: raw.to_string(),
            },
        }
    }

    /// Returns `true` for user defined property keys.
    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property { .. })
    }
}

impl From<&str> for ModelStateKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for ModelStateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeField { key } => f.write_str(key),
            Self::Property {
                alias,
                culture,
                segment,
                field,
            } => write!(
                f,
                "{}.{}.{}.{}.{}",
                PROPERTIES_PREFIX,
                alias,
                culture.as_deref().unwrap_or(NULL_LITERAL),
                segment.as_deref().unwrap_or(NULL_LITERAL),
                field.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn nullable(part: Option<&str>) -> Option<String> {
    part.filter(|p| !p.is_empty() && *p != NULL_LITERAL)
        .map(str::to_string)
}
