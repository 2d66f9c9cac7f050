//! Ordered store of validation error entries.

use log::{trace, warn};

use crate::decompose;
use crate::error::ValidationError;
use crate::matcher::{MatchOptions, path_matches};
use crate::model::{
    BlockNode, ErrorEntry, ErrorMessage, INVARIANT_CULTURE, ModelState, PropertyKey, Variant,
    normalize_culture,
};

/// Default limit for nested complex editor payloads.
pub const DEFAULT_MAX_BLOCK_DEPTH: usize = 32;

/// Ground truth collection of error entries.
///
/// Entries keep insertion order. At most one entry exists per
/// `(property_alias, culture, segment, field_name)`; adding an entry at an
/// existing coordinate is a no-op.
#[derive(Debug)]
pub struct ErrorStore {
    items: Vec<ErrorEntry>,
    max_block_depth: usize,
    revision: u64,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_max_block_depth(DEFAULT_MAX_BLOCK_DEPTH)
    }

    /// Creates an empty store with a custom nesting limit for complex editor
    /// payloads.
    pub fn with_max_block_depth(max_block_depth: usize) -> Self {
        Self {
            items: Vec::new(),
            max_block_depth,
            revision: 0,
        }
    }

    /// All entries in insertion order.
    pub fn items(&self) -> &[ErrorEntry] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_block_depth(&self) -> usize {
        self.max_block_depth
    }

    /// Counter bumped by every change to the entries.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Adds an error for a content property.
    ///
    /// The message is trimmed of surrounding whitespace and invisible
    /// characters. If it holds a complex editor payload, the payload is
    /// decomposed into nested entries and the property's own message is
    /// blanked.
    ///
    /// Returns `true` if a new entry was stored for `key`.
    pub fn add_property_error(
        &mut self,
        key: &PropertyKey,
        message: impl Into<ErrorMessage>,
    ) -> Result<bool, ValidationError> {
        if key.alias.is_empty() {
            return Err(ValidationError::MissingArgument("property_alias"));
        }
        Ok(self.insert_property(key, message.into(), 0))
    }

    /// Adds an error for a native field such as `Name`.
    ///
    /// Returns `true` if a new entry was stored.
    pub fn add_field_error(
        &mut self,
        field_name: &str,
        message: &str,
    ) -> Result<bool, ValidationError> {
        if field_name.is_empty() {
            return Err(ValidationError::MissingArgument("field_name"));
        }
        Ok(self.insert_field(field_name, message))
    }

    /// Adds every error in a ModelState, optionally nested below a parent
    /// validation path. Returns the number of new entries.
    pub fn add_model_state(
        &mut self,
        model_state: &ModelState,
        parent_path: Option<&str>,
    ) -> usize {
        decompose::apply_model_state(self, model_state, parent_path, 0)
    }

    pub(crate) fn insert_property(
        &mut self,
        key: &PropertyKey,
        message: ErrorMessage,
        depth: usize,
    ) -> bool {
        let error_msg = match message {
            ErrorMessage::Text(text) => {
                let text = trim_message(&text);
                if text.starts_with('[') {
                    let blocks = BlockNode::parse_list(text).unwrap_or_else(|e| {
                        warn!("Ignoring undecodable payload for {}: {}", key.alias, e);
                        Vec::new()
                    });
                    decompose::apply_blocks(self, &blocks, &key.alias, depth + 1);
                    String::new()
                } else {
                    text.to_string()
                }
            }
            ErrorMessage::Blocks(blocks) => {
                decompose::apply_blocks(self, &blocks, &key.alias, depth + 1);
                String::new()
            }
        };
        self.push_unique(ErrorEntry::property(key, error_msg))
    }

    pub(crate) fn insert_field(&mut self, field_name: &str, message: &str) -> bool {
        self.push_unique(ErrorEntry::field(field_name, message))
    }

    fn push_unique(&mut self, entry: ErrorEntry) -> bool {
        if self.items.iter().any(|item| item.same_coordinate(&entry)) {
            trace!("Ignoring duplicate error: {}", entry);
            return false;
        }
        trace!("Adding error: {}", entry);
        self.items.push(entry);
        self.revision += 1;
        true
    }

    /// Removes every property error matching `key` under `options`.
    ///
    /// Returns the number of removed entries.
    pub fn remove_property_errors(&mut self, key: &PropertyKey, options: MatchOptions) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !matches_property(item, key, options));
        let removed = before - self.items.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Property errors matching `key`.
    ///
    /// With a partial match type the field filter is ignored; otherwise
    /// `key.field == None` matches any field.
    pub fn property_errors(&self, key: &PropertyKey, options: MatchOptions) -> Vec<&ErrorEntry> {
        self.items
            .iter()
            .filter(|item| matches_property(item, key, options))
            .collect()
    }

    /// The first property error at exactly `key`.
    pub fn property_error(&self, key: &PropertyKey) -> Option<&ErrorEntry> {
        self.items
            .iter()
            .find(|item| matches_property(item, key, MatchOptions::exact()))
    }

    /// Native field errors for `field_name`.
    pub fn field_errors(&self, field_name: &str) -> Vec<&ErrorEntry> {
        self.items
            .iter()
            .filter(|item| {
                item.property_alias.is_none()
                    && item.culture == INVARIANT_CULTURE
                    && item.field_name.as_deref() == Some(field_name)
            })
            .collect()
    }

    /// The native field error for `field_name`, if any.
    pub fn field_error(&self, field_name: &str) -> Option<&ErrorEntry> {
        self.items.iter().find(|item| is_field_entry(item, field_name))
    }

    /// Every error in a variant, regardless of property or field.
    pub fn variant_errors(&self, variant: &Variant) -> Vec<&ErrorEntry> {
        self.items
            .iter()
            .filter(|item| item.in_variant(variant))
            .collect()
    }

    /// Exact existence check. `key.field == None` matches any field.
    pub fn has_property_error(&self, key: &PropertyKey) -> bool {
        self.items.iter().any(|item| {
            item.property_alias.as_deref() == Some(key.alias.as_str())
                && item.culture == key.culture
                && item.segment == key.segment
                && field_filter(item, key)
        })
    }

    pub fn has_field_error(&self, field_name: &str) -> bool {
        self.items.iter().any(|item| is_field_entry(item, field_name))
    }

    /// Returns `true` if the culture has an error outside of any segment.
    pub fn has_culture_error(&self, culture: Option<&str>) -> bool {
        let culture = normalize_culture(culture);
        self.items
            .iter()
            .any(|item| item.culture == culture && item.segment.is_none())
    }

    pub fn has_variant_error(&self, variant: &Variant) -> bool {
        self.items.iter().any(|item| item.in_variant(variant))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.revision += 1;
        }
    }
}

fn matches_property(item: &ErrorEntry, key: &PropertyKey, options: MatchOptions) -> bool {
    let Some(alias) = item.property_alias.as_deref() else {
        return false;
    };
    path_matches(alias, &key.alias, options.match_type)
        && item.culture == key.culture
        && item.segment == key.segment
        && (options.is_partial() || field_filter(item, key))
}

fn field_filter(item: &ErrorEntry, key: &PropertyKey) -> bool {
    key.field.is_none() || item.field_name == key.field
}

fn is_field_entry(item: &ErrorEntry, field_name: &str) -> bool {
    item.property_alias.is_none()
        && item.culture == INVARIANT_CULTURE
        && item.segment.is_none()
        && item.field_name.as_deref() == Some(field_name)
}

/// Strips whitespace and non-printable characters from both ends.
pub fn trim_message(message: &str) -> &str {
    message.trim_matches(|c: char| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}')
    })
}
