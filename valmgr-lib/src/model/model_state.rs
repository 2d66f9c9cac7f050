//! ModelState payloads.
//!
//! A ModelState is the server's map of keys to message lists:
//!
//! ```json
//! {
//!   "Name": ["Name is required"],
//!   "_Properties.title.en-US.null.": ["Too short"],
//!   "_Properties.blocks.invariant.null.": ["[{\"$id\":\"AAA\",\"ModelState\":{...}}]"]
//! }
//! ```
//!
//! Key order is preserved, since it decides the order of the stored entries.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::block::BlockNode;
use super::key::ModelStateKey;
use crate::error::DecodeError;

/// One message in a ModelState list.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorMessage {
    /// Plain text. May still contain a JSON encoded block list.
    Text(String),
    /// A pre-parsed complex editor payload.
    Blocks(Vec<BlockNode>),
}

impl ErrorMessage {
    /// Converts a JSON value into a message.
    ///
    /// Arrays are complex editor payloads, `null` is an empty message and any
    /// other scalar is kept as its JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) => Self::Blocks(BlockNode::list_from_value(value)),
            Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Returns the text, or `None` for pre-parsed payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Blocks(_) => None,
        }
    }
}

impl Default for ErrorMessage {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for ErrorMessage {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<BlockNode>> for ErrorMessage {
    fn from(blocks: Vec<BlockNode>) -> Self {
        Self::Blocks(blocks)
    }
}

/// A single ModelState key with its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStateEntry {
    pub raw_key: String,
    pub key: ModelStateKey,
    pub messages: Vec<ErrorMessage>,
}

impl ModelStateEntry {
    /// The first message, which is the only one that gets stored.
    pub fn first_message(&self) -> Option<&ErrorMessage> {
        self.messages.first()
    }
}

/// An ordered ModelState map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelState {
    entries: Vec<ModelStateEntry>,
}

impl ModelState {
    /// Creates an empty ModelState.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key with a single message.
    pub fn with(mut self, key: &str, message: impl Into<ErrorMessage>) -> Self {
        self.insert(key, vec![message.into()]);
        self
    }

    /// Appends a key with its messages.
    pub fn insert(&mut self, key: &str, messages: Vec<ErrorMessage>) {
        self.entries.push(ModelStateEntry {
            raw_key: key.to_string(),
            key: ModelStateKey::parse(key),
            messages,
        });
    }

    /// Parses a ModelState from JSON text.
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Builds a ModelState from a JSON value, which must be an object.
    ///
    /// A list value contributes its elements as messages, a bare string is a
    /// single message and `null` contributes none.
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let map = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let mut model_state = Self::new();
        for (key, messages) in map {
            let messages = match messages {
                Value::Array(items) => items.iter().map(ErrorMessage::from_value).collect(),
                Value::Null => Vec::new(),
                other => vec![ErrorMessage::from_value(other)],
            };
            model_state.insert(key, messages);
        }
        Ok(model_state)
    }

    /// Iterates over the entries in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, ModelStateEntry> {
        self.entries.iter()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ModelState {
    type Item = &'a ModelStateEntry;
    type IntoIter = std::slice::Iter<'a, ModelStateEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for ModelState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}
