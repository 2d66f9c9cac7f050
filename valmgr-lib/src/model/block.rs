//! Complex editor block trees.
//!
//! A complex editor reports its errors as a JSON array of blocks:
//!
//! ```json
//! [{
//!   "$id": "AAA",
//!   "$elementTypeAlias": "address",
//!   "ModelState": { "_Properties.city.invariant.null.": ["Required"] },
//!   "items": [{ "$id": "BBB", "ModelState": { ... } }]
//! }]
//! ```
//!
//! A block is only well formed when it has both `$id` and `ModelState`.
//! Malformed blocks are dropped while parsing, together with everything below
//! them, so traversal never has to second-guess the tree.

use log::warn;
use serde_json::Value;

use super::model_state::ModelState;
use crate::error::DecodeError;

const ID_KEY: &str = "$id";
const ELEMENT_TYPE_KEY: &str = "$elementTypeAlias";
const MODEL_STATE_KEY: &str = "ModelState";

/// A well formed block with its nested child lists.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    /// Block id, used as one validation path segment.
    pub id: String,
    /// Errors reported for this block's own properties.
    pub model_state: ModelState,
    /// Nested block lists keyed by the property that holds them.
    ///
    /// The key is informational only, it never becomes part of a path.
    pub children: Vec<(String, Vec<BlockNode>)>,
}

impl BlockNode {
    /// Creates a block without children.
    pub fn new(id: impl Into<String>, model_state: ModelState) -> Self {
        Self {
            id: id.into(),
            model_state,
            children: Vec::new(),
        }
    }

    /// Adds a nested block list.
    pub fn with_children(mut self, key: impl Into<String>, blocks: Vec<BlockNode>) -> Self {
        self.children.push((key.into(), blocks));
        self
    }

    /// Parses a JSON encoded block list.
    pub fn parse_list(json: &str) -> Result<Vec<Self>, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        if !value.is_array() {
            return Err(DecodeError::NotAnArray);
        }
        Ok(Self::list_from_value(&value))
    }

    /// Converts a JSON array into its well formed blocks.
    ///
    /// Anything that is not an array yields an empty list.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default()
    }

    /// Converts one JSON value into a block, or `None` if it is malformed.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let id = match object.get(ID_KEY) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Skipping block without {}", ID_KEY);
                return None;
            }
        };

        let model_state = match object.get(MODEL_STATE_KEY).map(ModelState::from_value) {
            Some(Ok(ms)) => ms,
            _ => {
                warn!("Skipping block {} without {}", id, MODEL_STATE_KEY);
                return None;
            }
        };

        let children = object
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), ID_KEY | ELEMENT_TYPE_KEY | MODEL_STATE_KEY))
            .filter(|(_, value)| value.is_array())
            .map(|(key, value)| (key.clone(), Self::list_from_value(value)))
            .collect();

        Some(Self {
            id,
            model_state,
            children,
        })
    }

    /// Counts this block and all of its descendants.
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|(_, blocks)| blocks)
            .map(BlockNode::count)
            .sum::<usize>()
    }
}
