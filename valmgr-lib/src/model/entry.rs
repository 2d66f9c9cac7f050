//! Error entries and the coordinates used to address them.

use serde::Serialize;

/// Culture assigned to entries and subscriptions that don't name one.
pub const INVARIANT_CULTURE: &str = "invariant";

/// Normalizes a culture: missing or empty becomes [`INVARIANT_CULTURE`].
pub fn normalize_culture(culture: Option<&str>) -> String {
    match culture {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => INVARIANT_CULTURE.to_string(),
    }
}

/// Normalizes a segment: empty becomes `None`.
pub fn normalize_segment(segment: Option<&str>) -> Option<String> {
    segment.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Normalizes a field name: empty becomes `None`.
pub fn normalize_field(field: Option<&str>) -> Option<String> {
    field.filter(|f| !f.is_empty()).map(str::to_string)
}

/// A single stored validation failure.
///
/// Property errors carry a `property_alias`, which may be a `/` separated
/// validation path for errors inside complex editors. Native field errors
/// have no alias and always live in the invariant culture with no segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    /// Property alias or validation path; `None` for native field errors.
    pub property_alias: Option<String>,
    /// Culture of the variant this error belongs to.
    pub culture: String,
    /// Segment of the variant, if any.
    pub segment: Option<String>,
    /// Sub-field reference within a property, or the native field name.
    pub field_name: Option<String>,
    /// Display message.
    pub error_msg: String,
}

impl ErrorEntry {
    /// Creates a property error entry.
    pub fn property(key: &PropertyKey, error_msg: impl Into<String>) -> Self {
        Self {
            property_alias: Some(key.alias.clone()),
            culture: key.culture.clone(),
            segment: key.segment.clone(),
            field_name: key.field.clone(),
            error_msg: error_msg.into(),
        }
    }

    /// Creates a native field error entry.
    pub fn field(field_name: impl Into<String>, error_msg: impl Into<String>) -> Self {
        Self {
            property_alias: None,
            culture: INVARIANT_CULTURE.to_string(),
            segment: None,
            field_name: Some(field_name.into()),
            error_msg: error_msg.into(),
        }
    }

    /// Returns `true` if this is a native field error.
    pub fn is_field_error(&self) -> bool {
        self.property_alias.is_none()
    }

    /// Returns `true` if both entries address the same coordinate.
    pub fn same_coordinate(&self, other: &ErrorEntry) -> bool {
        self.property_alias == other.property_alias
            && self.culture == other.culture
            && self.segment == other.segment
            && self.field_name == other.field_name
    }

    /// Returns `true` if this entry belongs to the given variant.
    pub fn in_variant(&self, variant: &Variant) -> bool {
        self.culture == variant.culture && self.segment == variant.segment
    }
}

impl std::fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match (&self.property_alias, &self.field_name) {
            (Some(alias), Some(field)) => format!("{}#{}", alias, field),
            (Some(alias), None) => alias.clone(),
            (None, Some(field)) => field.clone(),
            (None, None) => String::new(),
        };
        match &self.segment {
            Some(segment) => write!(
                f,
                "{} [{}/{}]: {}",
                target, self.culture, segment, self.error_msg
            ),
            None => write!(f, "{} [{}]: {}", target, self.culture, self.error_msg),
        }
    }
}

/// Address of a property error: alias (or validation path) plus variant and
/// optional sub-field.
///
/// When used as a query, `field: None` means "any field".
///
/// # Example
///
/// ```
/// use valmgr_lib::model::PropertyKey;
///
/// let key = PropertyKey::new("title").with_culture("en-US").with_field("value");
/// assert_eq!(key.culture, "en-US");
/// assert_eq!(key.segment, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub alias: String,
    pub culture: String,
    pub segment: Option<String>,
    pub field: Option<String>,
}

impl PropertyKey {
    /// Creates a key for the invariant culture with no segment or field.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            culture: INVARIANT_CULTURE.to_string(),
            segment: None,
            field: None,
        }
    }

    /// Creates a key from nullable parts, normalizing each one.
    pub fn from_parts(
        alias: impl Into<String>,
        culture: Option<&str>,
        segment: Option<&str>,
        field: Option<&str>,
    ) -> Self {
        Self {
            alias: alias.into(),
            culture: normalize_culture(culture),
            segment: normalize_segment(segment),
            field: normalize_field(field),
        }
    }

    /// Sets the culture.
    pub fn with_culture(mut self, culture: &str) -> Self {
        self.culture = normalize_culture(Some(culture));
        self
    }

    /// Sets the segment.
    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = normalize_segment(Some(segment));
        self
    }

    /// Sets the sub-field reference.
    pub fn with_field(mut self, field: &str) -> Self {
        self.field = normalize_field(Some(field));
        self
    }

    /// Clears the sub-field reference.
    pub fn without_field(mut self) -> Self {
        self.field = None;
        self
    }

    /// The variant this key belongs to.
    pub fn variant(&self) -> Variant {
        Variant {
            culture: self.culture.clone(),
            segment: self.segment.clone(),
        }
    }
}

/// A `(culture, segment)` pair identifying one rendition of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub culture: String,
    pub segment: Option<String>,
}

impl Variant {
    /// Creates a variant from nullable parts.
    pub fn new(culture: Option<&str>, segment: Option<&str>) -> Self {
        Self {
            culture: normalize_culture(culture),
            segment: normalize_segment(segment),
        }
    }

    /// The invariant culture with no segment.
    pub fn invariant() -> Self {
        Self::new(None, None)
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::invariant()
    }
}
