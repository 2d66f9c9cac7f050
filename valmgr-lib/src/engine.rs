//! Notification engine.
//!
//! Resolves, for each subscriber, the entries that currently match its
//! coordinate and invokes it. Store and registry borrows are released before
//! a callback runs, so callbacks may call back into the manager.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::model::{ErrorEntry, PropertyKey};
use crate::scheduler::{Deferred, Scheduler};
use crate::store::ErrorStore;
use crate::subscription::{Notification, Subscriber, SubscriptionRegistry, SubscriptionTarget};

/// Drives notification passes over a store and a registry.
#[derive(Debug, Default)]
pub struct NotificationEngine {
    scheduler: Scheduler,
}

impl NotificationEngine {
    pub fn new(coalesce: bool) -> Self {
        Self {
            scheduler: Scheduler::new(coalesce),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Schedules a pass on the next tick.
    pub fn schedule(&self, task: Deferred) -> bool {
        self.scheduler.schedule(task)
    }

    /// Runs every pending pass. Returns the number of passes run.
    pub fn flush(
        &self,
        store: &RefCell<ErrorStore>,
        registry: &RefCell<SubscriptionRegistry>,
    ) -> usize {
        self.scheduler.drain(|task| {
            notify_all(store, registry);
            if task == Deferred::NotifyAndClear {
                store.borrow_mut().clear();
            }
        })
    }
}

/// Copy of the store's entries shared by the callbacks of one pass.
///
/// Taken again only when a callback has changed the store in between.
#[derive(Debug, Default)]
pub struct Snapshot {
    revision: Option<u64>,
    items: Rc<[ErrorEntry]>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries as of `store`'s current revision.
    pub fn refresh(&mut self, store: &ErrorStore) -> Rc<[ErrorEntry]> {
        if self.revision != Some(store.revision()) {
            self.revision = Some(store.revision());
            self.items = store.items().into();
        }
        self.items.clone()
    }
}

/// Notifies every subscriber registered at the start of the pass, in
/// subscription order.
pub fn notify_all(store: &RefCell<ErrorStore>, registry: &RefCell<SubscriptionRegistry>) {
    let subscribers = registry.borrow().snapshot();
    debug!(
        "Notifying {} subscriber(s) of {} error(s)",
        subscribers.len(),
        store.borrow().len()
    );
    let mut snapshot = Snapshot::new();
    for subscriber in &subscribers {
        notify_with(store, subscriber, &mut snapshot);
    }
}

/// Notifies a single subscriber of the entries matching its coordinate.
pub fn notify_one(store: &RefCell<ErrorStore>, subscriber: &Subscriber) {
    notify_with(store, subscriber, &mut Snapshot::new());
}

fn notify_with(store: &RefCell<ErrorStore>, subscriber: &Subscriber, snapshot: &mut Snapshot) {
    let (errors, all_errors) = {
        let store = store.borrow();
        (resolve(&store, subscriber), snapshot.refresh(&store))
    };
    let key = subscriber.key();
    subscriber.invoke(&Notification {
        is_valid: errors.is_empty(),
        errors: &errors,
        all_errors: &all_errors,
        culture: Some(key.culture.as_str()),
        segment: key.segment.as_deref(),
    });
}

/// Tells every subscriber it is valid, without consulting the store.
pub fn broadcast_valid(registry: &RefCell<SubscriptionRegistry>) {
    let subscribers = registry.borrow().snapshot();
    debug!("Resetting {} subscriber(s) to valid", subscribers.len());
    for subscriber in &subscribers {
        subscriber.invoke(&Notification {
            is_valid: true,
            errors: &[],
            all_errors: &[],
            culture: None,
            segment: None,
        });
    }
}

/// Entries currently matching a subscriber.
pub fn resolve(store: &ErrorStore, subscriber: &Subscriber) -> Vec<ErrorEntry> {
    let key = subscriber.key();
    let matches = match &key.target {
        SubscriptionTarget::Field { field_name } => store.field_errors(field_name),
        SubscriptionTarget::Property {
            alias,
            field_name,
            options,
        } => {
            let query = PropertyKey {
                alias: alias.clone(),
                culture: key.culture.clone(),
                segment: key.segment.clone(),
                field: field_name.clone(),
            };
            store.property_errors(&query, *options)
        }
        SubscriptionTarget::Variant => store.variant_errors(&key.variant_of()),
    };
    matches.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_shared_until_store_changes() {
        let mut store = ErrorStore::new();
        store.add_field_error("Name", "Required").unwrap();

        let mut snapshot = Snapshot::new();
        let first = snapshot.refresh(&store);
        let second = snapshot.refresh(&store);
        assert!(Rc::ptr_eq(&first, &second));

        store.add_field_error("Alias", "Required").unwrap();
        let third = snapshot.refresh(&store);
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 2);
    }
}
