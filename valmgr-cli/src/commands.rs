//! Command implementations.
//!
//! Each command feeds ModelState documents through a manager and returns JSON
//! values; printing is left to `main`.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Args;
use log::{debug, info};
use serde_json::{Value, json};
use valmgr_lib::model::{ErrorEntry, ModelState, PropertyKey, Variant};
use valmgr_lib::{MatchOptions, MatchType, Notification, ServerValidationManager, SubscriptionKey};

use crate::error::CliError;

/// Coordinate selected on the command line.
///
/// An alias selects property errors, a field alone selects native field
/// errors, and neither selects a whole variant.
#[derive(Debug, Clone, Default, Args)]
pub struct Coordinate {
    /// Property alias or validation path, e.g. `blocks/AAA/city`.
    #[arg(long)]
    pub alias: Option<String>,
    /// Field name. Without an alias this is a native field.
    #[arg(long)]
    pub field: Option<String>,
    #[arg(long)]
    pub culture: Option<String>,
    #[arg(long)]
    pub segment: Option<String>,
    /// How the alias is compared: exact, prefix, suffix or contains.
    #[arg(long = "match", default_value = "exact")]
    pub match_type: MatchType,
}

impl Coordinate {
    pub fn subscription_key(&self) -> SubscriptionKey {
        SubscriptionKey::from_coordinate(
            self.alias.as_deref(),
            self.culture.as_deref(),
            self.field.as_deref(),
            self.segment.as_deref(),
            MatchOptions::with_type(self.match_type),
        )
    }
}

/// Reads and decodes a ModelState document.
pub fn load_model_state(path: &Path) -> Result<ModelState, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ModelState::from_json(&text).map_err(|source| CliError::ModelState {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

/// Adds a document and lists every resulting entry.
pub fn inspect(
    manager: &ServerValidationManager,
    model_state: &ModelState,
    parent_path: Option<&str>,
) -> Value {
    let added = manager.add_errors_for_model_state(model_state, parent_path);
    manager.flush();
    json!({
        "added": added,
        "errors": manager.items().to_vec(),
    })
}

/// Entries at a coordinate, resolved the way a subscriber there would see
/// them.
pub fn query(manager: &ServerValidationManager, coordinate: &Coordinate) -> Vec<ErrorEntry> {
    let options = MatchOptions::with_type(coordinate.match_type);
    match (&coordinate.alias, &coordinate.field) {
        (Some(alias), field) => {
            let key = PropertyKey::from_parts(
                alias,
                coordinate.culture.as_deref(),
                coordinate.segment.as_deref(),
                field.as_deref(),
            );
            manager.get_property_errors(&key, options)
        }
        (None, Some(field)) => manager.get_field_errors(field),
        (None, None) => manager.get_variant_errors(&Variant::new(
            coordinate.culture.as_deref(),
            coordinate.segment.as_deref(),
        )),
    }
}

/// Replays documents as successive submissions and reports what a
/// subscriber at `coordinate` is told.
///
/// Each document resets the manager, is added, and is delivered on the next
/// tick. Returns one event per callback invocation.
pub async fn watch(
    manager: &ServerValidationManager,
    coordinate: &Coordinate,
    submissions: &[(PathBuf, ModelState)],
) -> Result<Vec<Value>, CliError> {
    let phase = Rc::new(RefCell::new("subscribe".to_string()));
    let events = Rc::new(RefCell::new(Vec::new()));

    let subscription = {
        let phase = phase.clone();
        let events = events.clone();
        manager.subscribe(coordinate.subscription_key(), move |n: &Notification<'_>| {
            events.borrow_mut().push(json!({
                "phase": phase.borrow().as_str(),
                "is_valid": n.is_valid,
                "culture": n.culture,
                "segment": n.segment,
                "errors": n.errors,
                "total": n.all_errors.len(),
            }));
        })?
    };

    for (path, model_state) in submissions {
        info!("Submitting {}", path.display());
        *phase.borrow_mut() = format!("reset {}", path.display());
        manager.reset();

        *phase.borrow_mut() = path.display().to_string();
        manager.add_errors_for_model_state(model_state, None);
        let passes = manager.next_tick().await;
        debug!("{} pass(es) for {}", passes, path.display());
    }

    subscription.unsubscribe();
    Ok(events.take())
}
