//! The server validation manager.
//!
//! One manager is created per editing session and handed to every widget that
//! needs it. Clones share the same store and subscriptions.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use valmgr_lib::model::{ModelState, PropertyKey};
//! use valmgr_lib::{ServerValidationManager, SubscriptionKey};
//!
//! let manager = ServerValidationManager::new();
//! let valid = Rc::new(Cell::new(true));
//!
//! let seen = valid.clone();
//! let _subscription = manager
//!     .subscribe(SubscriptionKey::property("title"), move |n| seen.set(n.is_valid))
//!     .unwrap();
//!
//! let model_state = ModelState::new().with("_Properties.title.invariant.null.", "Required");
//! manager.add_errors_for_model_state(&model_state, None);
//! manager.flush();
//!
//! assert!(!valid.get());
//! assert!(manager.has_property_error(&PropertyKey::new("title")));
//! ```

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use log::debug;

use crate::config::ManagerConfig;
use crate::decompose::{self, DecomposedUnit};
use crate::engine::{self, NotificationEngine};
use crate::error::{DecodeError, ValidationError};
use crate::matcher::MatchOptions;
use crate::model::{ErrorEntry, ErrorMessage, ModelState, PropertyKey, Variant};
use crate::scheduler::Deferred;
use crate::store::ErrorStore;
use crate::subscription::{
    Notification, SubscriptionId, SubscriptionKey, SubscriptionRegistry,
};

struct Inner {
    config: ManagerConfig,
    store: RefCell<ErrorStore>,
    registry: RefCell<SubscriptionRegistry>,
    engine: NotificationEngine,
}

/// Stores server validation errors and notifies subscribed widgets.
#[derive(Clone)]
pub struct ServerValidationManager {
    inner: Rc<Inner>,
}

impl Default for ServerValidationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServerValidationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerValidationManager")
            .field("config", &self.inner.config)
            .field("errors", &self.inner.store.borrow().len())
            .field("subscribers", &self.inner.registry.borrow().len())
            .field("pending", &self.inner.engine.scheduler().pending())
            .finish()
    }
}

impl ServerValidationManager {
    /// Creates a manager with the default config.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Creates a manager with a custom config.
    pub fn with_config(config: ManagerConfig) -> Self {
        let inner = Inner {
            store: RefCell::new(ErrorStore::with_max_block_depth(config.max_block_depth)),
            registry: RefCell::new(SubscriptionRegistry::new()),
            engine: NotificationEngine::new(config.coalesce_notifications),
            config,
        };
        Self {
            inner: Rc::new(inner),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Adds every error of a server ModelState and schedules one notify pass.
    ///
    /// `parent_path` nests every property key below a validation path.
    /// Returns the number of new entries.
    pub fn add_errors_for_model_state(
        &self,
        model_state: &ModelState,
        parent_path: Option<&str>,
    ) -> usize {
        let added = self
            .inner
            .store
            .borrow_mut()
            .add_model_state(model_state, parent_path);
        debug!(
            "Added {} error(s) from a model state with {} key(s)",
            added,
            model_state.len()
        );
        self.notify();
        added
    }

    /// Parses a ModelState JSON document and adds its errors.
    pub fn add_errors_from_json(&self, json: &str) -> Result<usize, ValidationError> {
        let model_state = ModelState::from_json(json)?;
        Ok(self.add_errors_for_model_state(&model_state, None))
    }

    /// Adds an error for a content property and schedules a notify pass.
    pub fn add_property_error(
        &self,
        key: &PropertyKey,
        message: impl Into<ErrorMessage>,
    ) -> Result<(), ValidationError> {
        self.inner
            .store
            .borrow_mut()
            .add_property_error(key, message)?;
        self.notify();
        Ok(())
    }

    /// Adds an error for a native field and schedules a notify pass.
    pub fn add_field_error(&self, field_name: &str, message: &str) -> Result<(), ValidationError> {
        self.inner
            .store
            .borrow_mut()
            .add_field_error(field_name, message)?;
        self.notify();
        Ok(())
    }

    /// Removes matching property errors. Schedules a notify pass only when
    /// something was removed. Returns the number of removed entries.
    pub fn remove_property_error(&self, key: &PropertyKey, options: MatchOptions) -> usize {
        let removed = self
            .inner
            .store
            .borrow_mut()
            .remove_property_errors(key, options);
        if removed > 0 {
            debug!("Removed {} error(s) for {}", removed, key.alias);
            self.notify();
        }
        removed
    }

    /// Removes every error. Subscribers are not notified.
    pub fn clear(&self) {
        self.inner.store.borrow_mut().clear();
    }

    /// Removes every error and immediately tells every subscriber it is
    /// valid. Used when a form is submitted again.
    pub fn reset(&self) {
        self.clear();
        engine::broadcast_valid(&self.inner.registry);
    }

    // ---------------------------------------------------------------------
    // Notification
    // ---------------------------------------------------------------------

    /// Schedules a notify pass on the next tick.
    pub fn notify(&self) {
        self.inner.engine.schedule(Deferred::Notify);
    }

    /// Schedules a notify pass that clears the store once every subscriber
    /// has been called. Used to carry errors across a navigation exactly once.
    pub fn notify_and_clear_all_subscriptions(&self) {
        self.inner.engine.schedule(Deferred::NotifyAndClear);
    }

    /// Runs every pending pass now. Returns the number of passes run.
    ///
    /// Does nothing when called from inside a subscriber.
    pub fn flush(&self) -> usize {
        self.inner
            .engine
            .flush(&self.inner.store, &self.inner.registry)
    }

    /// Waits for scheduled work, then runs it. Returns the number of passes
    /// run.
    pub async fn next_tick(&self) -> usize {
        loop {
            self.inner.engine.scheduler().wait().await;
            let passes = self.flush();
            if passes > 0 {
                return passes;
            }
        }
    }

    /// Returns `true` if a pass is waiting for the next tick.
    pub fn has_pending(&self) -> bool {
        self.inner.engine.scheduler().has_pending()
    }

    // ---------------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------------

    /// Subscribes a callback to a coordinate.
    ///
    /// The callback is invoked once right away with the current state, then
    /// on every notify pass until unsubscribed.
    pub fn subscribe<F>(
        &self,
        key: SubscriptionKey,
        callback: F,
    ) -> Result<Subscription, ValidationError>
    where
        F: Fn(&Notification<'_>) + 'static,
    {
        key.validate()?;
        let id = self
            .inner
            .registry
            .borrow_mut()
            .insert(key, Rc::new(callback));
        debug!("Subscribed {}", id);

        let subscriber = self.inner.registry.borrow().get(id).cloned();
        if let Some(subscriber) = subscriber {
            engine::notify_one(&self.inner.store, &subscriber);
        }

        Ok(Subscription {
            id,
            manager: Rc::downgrade(&self.inner),
        })
    }

    /// Removes every subscription bound to exactly `key`, ignoring match
    /// options. Returns the number removed.
    pub fn unsubscribe(&self, key: &SubscriptionKey) -> usize {
        self.inner.registry.borrow_mut().remove_at(key)
    }

    /// Removes a single subscription.
    pub fn unsubscribe_id(&self, id: SubscriptionId) -> bool {
        self.inner.registry.borrow_mut().remove(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Subscriptions that an error at `key` would reach.
    pub fn property_subscriptions(&self, key: &PropertyKey) -> Vec<SubscriptionId> {
        let registry = self.inner.registry.borrow();
        registry
            .property_subscribers(key)
            .iter()
            .map(|s| s.id())
            .collect()
    }

    pub fn field_subscriptions(&self, field_name: &str) -> Vec<SubscriptionId> {
        let registry = self.inner.registry.borrow();
        registry
            .field_subscribers(field_name)
            .iter()
            .map(|s| s.id())
            .collect()
    }

    pub fn variant_subscriptions(&self, variant: &Variant) -> Vec<SubscriptionId> {
        let registry = self.inner.registry.borrow();
        registry
            .variant_subscribers(variant)
            .iter()
            .map(|s| s.id())
            .collect()
    }

    pub fn culture_subscriptions(&self, culture: Option<&str>) -> Vec<SubscriptionId> {
        let registry = self.inner.registry.borrow();
        registry
            .culture_subscribers(culture)
            .iter()
            .map(|s| s.id())
            .collect()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Live, read-only view of every entry.
    ///
    /// Drop the returned guard before mutating the manager.
    pub fn items(&self) -> Ref<'_, [ErrorEntry]> {
        Ref::map(self.inner.store.borrow(), |store| store.items())
    }

    pub fn error_count(&self) -> usize {
        self.inner.store.borrow().len()
    }

    /// First property error at exactly `key`.
    pub fn get_property_error(&self, key: &PropertyKey) -> Option<ErrorEntry> {
        self.inner.store.borrow().property_error(key).cloned()
    }

    pub fn get_property_errors(&self, key: &PropertyKey, options: MatchOptions) -> Vec<ErrorEntry> {
        let store = self.inner.store.borrow();
        store.property_errors(key, options).into_iter().cloned().collect()
    }

    /// Property errors under a validation path, whatever their field.
    pub fn get_property_errors_by_validation_path(
        &self,
        path: &str,
        culture: Option<&str>,
        segment: Option<&str>,
        options: MatchOptions,
    ) -> Vec<ErrorEntry> {
        let key = PropertyKey::from_parts(path, culture, segment, None);
        self.get_property_errors(&key, options)
    }

    pub fn get_field_error(&self, field_name: &str) -> Option<ErrorEntry> {
        self.inner.store.borrow().field_error(field_name).cloned()
    }

    pub fn get_field_errors(&self, field_name: &str) -> Vec<ErrorEntry> {
        let store = self.inner.store.borrow();
        store.field_errors(field_name).into_iter().cloned().collect()
    }

    pub fn get_variant_errors(&self, variant: &Variant) -> Vec<ErrorEntry> {
        let store = self.inner.store.borrow();
        store.variant_errors(variant).into_iter().cloned().collect()
    }

    /// Exact existence check; partial match types are not supported here.
    pub fn has_property_error(&self, key: &PropertyKey) -> bool {
        self.inner.store.borrow().has_property_error(key)
    }

    pub fn has_field_error(&self, field_name: &str) -> bool {
        self.inner.store.borrow().has_field_error(field_name)
    }

    pub fn has_culture_error(&self, culture: Option<&str>) -> bool {
        self.inner.store.borrow().has_culture_error(culture)
    }

    pub fn has_variant_error(&self, variant: &Variant) -> bool {
        self.inner.store.borrow().has_variant_error(variant)
    }

    // ---------------------------------------------------------------------
    // Decomposition helpers
    // ---------------------------------------------------------------------

    /// Builds the key a property is stored under below `parent_path`.
    pub fn create_property_validation_key(alias: &str, parent_path: Option<&str>) -> String {
        decompose::property_validation_key(alias, parent_path)
    }

    /// Flattens a complex editor payload into validation path units.
    pub fn parse_complex_editor_error(
        message: &ErrorMessage,
        parent_path: &str,
    ) -> Result<Vec<DecomposedUnit>, DecodeError> {
        decompose::parse_complex_editor_error(message, parent_path)
    }
}

/// Handle to a registered subscription.
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    manager: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes this subscription. Returns `false` if it was already removed
    /// or the manager is gone.
    pub fn unsubscribe(self) -> bool {
        match self.manager.upgrade() {
            Some(inner) => inner.registry.borrow_mut().remove(self.id),
            None => false,
        }
    }
}
