//! Decomposition of ModelState payloads into flat, addressable entries.
//!
//! Complex editors nest ModelStates inside block lists. Every well formed
//! block contributes one validation path segment (its `$id`), so a property
//! `city` on block `BBB` nested in block `AAA` of the `blocks` property is
//! stored at `blocks/AAA/BBB/city`.

use log::{debug, warn};

use crate::error::DecodeError;
use crate::matcher::PATH_SEPARATOR;
use crate::model::{BlockNode, ErrorMessage, ModelState, ModelStateKey, PropertyKey};
use crate::store::ErrorStore;

/// One block's ModelState together with its validation path.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedUnit {
    pub validation_path: String,
    pub model_state: ModelState,
}

/// Builds the key a property is stored under: `parent/alias`, or just
/// `alias` at the top level.
pub fn property_validation_key(alias: &str, parent_path: Option<&str>) -> String {
    match parent_path {
        Some(parent) if !parent.is_empty() => format!("{parent}{PATH_SEPARATOR}{alias}"),
        _ => alias.to_string(),
    }
}

/// Flattens a block tree into `(validation_path, model_state)` units, depth
/// first, parents before children.
pub fn decompose_blocks(blocks: &[BlockNode], parent_path: &str) -> Vec<DecomposedUnit> {
    let mut units = Vec::new();
    walk(blocks, parent_path, &mut |path, model_state| {
        units.push(DecomposedUnit {
            validation_path: path.to_string(),
            model_state: model_state.clone(),
        });
    });
    units
}

/// Decomposes a complex editor error message, given either as JSON text or
/// as a pre-parsed block list.
pub fn parse_complex_editor_error(
    message: &ErrorMessage,
    parent_path: &str,
) -> Result<Vec<DecomposedUnit>, DecodeError> {
    match message {
        ErrorMessage::Text(text) => {
            let blocks = BlockNode::parse_list(text.trim())?;
            Ok(decompose_blocks(&blocks, parent_path))
        }
        ErrorMessage::Blocks(blocks) => Ok(decompose_blocks(blocks, parent_path)),
    }
}

fn walk<'a>(
    blocks: &'a [BlockNode],
    parent_path: &str,
    visit: &mut dyn FnMut(&str, &'a ModelState),
) {
    for block in blocks {
        let path = format!("{parent_path}{PATH_SEPARATOR}{}", block.id);
        visit(&path, &block.model_state);
        for (_, children) in &block.children {
            walk(children, &path, visit);
        }
    }
}

/// Adds every unit of a block tree to the store.
pub(crate) fn apply_blocks(
    store: &mut ErrorStore,
    blocks: &[BlockNode],
    parent_path: &str,
    depth: usize,
) -> usize {
    if depth > store.max_block_depth() {
        warn!(
            "Skipping complex editor payload below {}: nesting exceeds {}",
            parent_path,
            store.max_block_depth()
        );
        return 0;
    }

    let mut units = Vec::new();
    walk(blocks, parent_path, &mut |path, model_state| {
        units.push((path.to_string(), model_state));
    });
    debug!(
        "Decomposed {} block(s) below {} into {} unit(s)",
        blocks.len(),
        parent_path,
        units.len()
    );

    units
        .into_iter()
        .map(|(path, model_state)| apply_model_state(store, model_state, Some(&path), depth))
        .sum()
}

/// Adds every key of a ModelState to the store. Returns the number of new
/// entries, including nested ones.
pub(crate) fn apply_model_state(
    store: &mut ErrorStore,
    model_state: &ModelState,
    parent_path: Option<&str>,
    depth: usize,
) -> usize {
    let before = store.len();

    for entry in model_state {
        let first = entry.first_message().cloned().unwrap_or_default();

        match &entry.key {
            ModelStateKey::Property {
                alias,
                culture,
                segment,
                field,
            } => {
                if alias.is_empty() {
                    warn!("Skipping property key without alias: {}", entry.raw_key);
                    continue;
                }
                let key = PropertyKey::from_parts(
                    property_validation_key(alias, parent_path),
                    culture.as_deref(),
                    segment.as_deref(),
                    field.as_deref(),
                );
                store.insert_property(&key, first, depth);
            }
            ModelStateKey::NativeField { key } => {
                if key.is_empty() {
                    warn!("Skipping native field error with an empty key");
                    continue;
                }
                let message = first.as_text().unwrap_or_else(|| {
                    warn!("Ignoring block payload on native field {}", key);
                    ""
                });
                store.insert_field(key, message);
            }
        }
    }

    store.len() - before
}
