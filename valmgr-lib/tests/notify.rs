//! Tests for subscriptions and notification passes.

use std::cell::RefCell;
use std::rc::Rc;

use valmgr_lib::model::{ModelState, PropertyKey, Variant};
use valmgr_lib::{
    ManagerConfig, MatchOptions, Notification, ServerValidationManager, SubscriptionKey,
};

/// What a subscriber saw on one invocation.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    is_valid: bool,
    errors: Vec<String>,
    all: usize,
    culture: Option<String>,
    segment: Option<String>,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Rc<RefCell<Vec<Seen>>>,
}

impl Recorder {
    fn callback(&self) -> impl Fn(&Notification<'_>) + 'static {
        let calls = self.calls.clone();
        move |n| {
            calls.borrow_mut().push(Seen {
                is_valid: n.is_valid,
                errors: n.errors.iter().map(|e| e.error_msg.clone()).collect(),
                all: n.all_errors.len(),
                culture: n.culture.map(str::to_string),
                segment: n.segment.map(str::to_string),
            })
        }
    }

    fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn last(&self) -> Seen {
        self.calls.borrow().last().cloned().expect("no calls recorded")
    }
}

#[test]
fn test_subscribe_fires_immediately_without_errors() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager
        .subscribe(SubscriptionKey::property("title"), recorder.callback())
        .unwrap();

    assert_eq!(recorder.count(), 1);
    let seen = recorder.last();
    assert!(seen.is_valid);
    assert!(seen.errors.is_empty());
    assert_eq!(seen.culture.as_deref(), Some("invariant"));
    assert_eq!(seen.segment, None);
}

#[test]
fn test_late_field_subscriber_sees_existing_error() {
    let manager = ServerValidationManager::new();
    manager.add_field_error("name", "Name is required").unwrap();

    let recorder = Recorder::default();
    manager
        .subscribe(
            SubscriptionKey::from_coordinate(
                None,
                None,
                Some("name"),
                None,
                MatchOptions::default(),
            ),
            recorder.callback(),
        )
        .unwrap();

    assert_eq!(recorder.count(), 1);
    let seen = recorder.last();
    assert!(!seen.is_valid);
    assert_eq!(seen.errors, ["Name is required"]);
}

#[test]
fn test_mutations_are_deferred_and_coalesced() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager
        .subscribe(SubscriptionKey::variant(None, None), recorder.callback())
        .unwrap();
    assert_eq!(recorder.count(), 1);

    manager.add_property_error(&PropertyKey::new("a"), "x").unwrap();
    manager.add_property_error(&PropertyKey::new("b"), "y").unwrap();
    manager.add_field_error("Name", "z").unwrap();
    manager.notify();

    // nothing fires until the next tick
    assert_eq!(recorder.count(), 1);
    assert_eq!(manager.flush(), 1);
    assert_eq!(recorder.count(), 2);

    let seen = recorder.last();
    assert!(!seen.is_valid);
    assert_eq!(seen.errors, ["x", "y", "z"]);
    assert_eq!(seen.all, 3);

    assert_eq!(manager.flush(), 0);
}

#[test]
fn test_model_state_yields_single_pass() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager
        .subscribe(
            SubscriptionKey::property("blocks").with_match(MatchOptions::prefix()),
            recorder.callback(),
        )
        .unwrap();

    let payload = r#"[{"$id":"AAA","ModelState":{"_Properties.city.invariant.null.":["Required"],"_Properties.street.invariant.null.":["Required"]},"items":[{"$id":"BBB","ModelState":{"_Properties.zip.invariant.null.":["Invalid"]}}]}]"#;
    let model_state = ModelState::new()
        .with("_Properties.blocks.invariant.null.", payload)
        .with("Name", "Name is required");
    manager.add_errors_for_model_state(&model_state, None);

    assert_eq!(manager.flush(), 1);
    assert_eq!(recorder.count(), 2);
    // the exact "blocks" entry matches too, with its blanked message
    assert_eq!(recorder.last().errors, ["Required", "Required", "Invalid", ""]);
}

#[test]
fn test_unsubscribed_callback_is_not_invoked() {
    let manager = ServerValidationManager::new();
    let kept = Recorder::default();
    let dropped = Recorder::default();
    manager
        .subscribe(SubscriptionKey::property("title"), kept.callback())
        .unwrap();
    let subscription = manager
        .subscribe(SubscriptionKey::property("title"), dropped.callback())
        .unwrap();

    manager.add_property_error(&PropertyKey::new("title"), "Required").unwrap();
    assert!(manager.unsubscribe_id(subscription.id()));
    manager.flush();

    assert_eq!(kept.count(), 2);
    assert_eq!(dropped.count(), 1);
}

#[test]
fn test_subscription_handle_unsubscribe() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    let subscription = manager
        .subscribe(SubscriptionKey::field("Name"), recorder.callback())
        .unwrap();
    assert!(subscription.clone().unsubscribe());
    assert!(!subscription.unsubscribe());

    manager.add_field_error("Name", "x").unwrap();
    manager.flush();
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_bulk_unsubscribe_ignores_match_options() {
    // Removal only compares coordinates even though subscriptions carry
    // match options; a prefix subscriber at "blocks" is removed by an exact
    // unsubscribe at "blocks".
    let manager = ServerValidationManager::new();
    let exact = Recorder::default();
    let prefix = Recorder::default();
    let other = Recorder::default();
    manager
        .subscribe(SubscriptionKey::property("blocks"), exact.callback())
        .unwrap();
    manager
        .subscribe(
            SubscriptionKey::property("blocks").with_match(MatchOptions::prefix()),
            prefix.callback(),
        )
        .unwrap();
    manager
        .subscribe(SubscriptionKey::property("blocks/AAA/city"), other.callback())
        .unwrap();

    assert_eq!(manager.unsubscribe(&SubscriptionKey::property("blocks")), 2);
    assert_eq!(manager.subscription_count(), 1);
}

#[test]
fn test_unsubscribe_field_and_variant() {
    let manager = ServerValidationManager::new();
    manager
        .subscribe(SubscriptionKey::field("Name"), |_| {})
        .unwrap();
    manager
        .subscribe(SubscriptionKey::variant(Some("da"), None), |_| {})
        .unwrap();
    manager
        .subscribe(SubscriptionKey::variant(Some("da"), Some("mobile")), |_| {})
        .unwrap();

    assert_eq!(manager.unsubscribe(&SubscriptionKey::field("Name")), 1);
    assert_eq!(manager.unsubscribe(&SubscriptionKey::variant(Some("da"), None)), 1);
    assert_eq!(manager.subscription_count(), 1);
}

#[test]
fn test_reset_notifies_everyone_valid() {
    let manager = ServerValidationManager::new();
    manager.add_property_error(&PropertyKey::new("title"), "Required").unwrap();
    manager.add_field_error("Name", "Name is required").unwrap();

    let recorders: Vec<Recorder> = (0..3).map(|_| Recorder::default()).collect();
    manager
        .subscribe(SubscriptionKey::property("title"), recorders[0].callback())
        .unwrap();
    manager
        .subscribe(SubscriptionKey::field("Name"), recorders[1].callback())
        .unwrap();
    manager
        .subscribe(SubscriptionKey::variant(Some("en-US"), None), recorders[2].callback())
        .unwrap();

    manager.reset();

    assert_eq!(manager.error_count(), 0);
    for recorder in &recorders {
        assert_eq!(recorder.count(), 2);
        let seen = recorder.last();
        assert!(seen.is_valid);
        assert!(seen.errors.is_empty());
        assert_eq!(seen.all, 0);
        assert_eq!(seen.culture, None);
        assert_eq!(seen.segment, None);
    }
}

#[test]
fn test_notify_and_clear_transfers_once() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager
        .subscribe(SubscriptionKey::field("Name"), recorder.callback())
        .unwrap();
    manager.flush();

    manager.add_field_error("Name", "Name is required").unwrap();
    manager.flush();
    manager.notify_and_clear_all_subscriptions();
    assert_eq!(manager.error_count(), 1);

    manager.flush();
    assert_eq!(manager.error_count(), 0);
    assert_eq!(recorder.count(), 3);
    assert!(!recorder.last().is_valid);

    // the next pass reports the cleared state
    manager.notify();
    manager.flush();
    assert!(recorder.last().is_valid);
}

#[test]
fn test_callbacks_fire_in_subscription_order() {
    let manager = ServerValidationManager::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = order.clone();
        manager
            .subscribe(SubscriptionKey::variant(None, None), move |_| {
                order.borrow_mut().push(name)
            })
            .unwrap();
    }
    order.borrow_mut().clear();

    manager.notify();
    manager.flush();
    assert_eq!(*order.borrow(), ["first", "second", "third"]);
}

#[test]
fn test_removing_last_error_reports_valid() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager.add_property_error(&PropertyKey::new("title"), "Required").unwrap();
    manager
        .subscribe(SubscriptionKey::property("title"), recorder.callback())
        .unwrap();
    assert!(!recorder.last().is_valid);

    manager.remove_property_error(&PropertyKey::new("title"), MatchOptions::exact());
    manager.flush();
    assert!(recorder.last().is_valid);
}

#[test]
fn test_callback_may_reenter_manager() {
    let manager = ServerValidationManager::new();
    let inner = manager.clone();
    let flushes = Rc::new(RefCell::new(Vec::new()));
    let seen = flushes.clone();
    manager
        .subscribe(SubscriptionKey::field("Name"), move |n| {
            if !n.is_valid && !inner.has_field_error("Alias") {
                inner.add_field_error("Alias", "Alias is required").unwrap();
                seen.borrow_mut().push(inner.flush());
            }
        })
        .unwrap();

    manager.add_field_error("Name", "Name is required").unwrap();
    // the pass scheduled by the callback runs in the same flush
    assert_eq!(manager.flush(), 2);
    assert_eq!(*flushes.borrow(), [0]);
    assert!(manager.has_field_error("Alias"));
}

#[test]
fn test_flush_recovers_after_panicking_subscriber() {
    let manager = ServerValidationManager::new();
    let failed = Rc::new(std::cell::Cell::new(false));
    let recorder = Recorder::default();
    {
        let failed = failed.clone();
        manager
            .subscribe(SubscriptionKey::property("title"), move |n| {
                if !n.is_valid && !failed.replace(true) {
                    panic!("widget failed to render");
                }
            })
            .unwrap();
    }
    manager
        .subscribe(SubscriptionKey::property("other"), recorder.callback())
        .unwrap();

    manager.add_property_error(&PropertyKey::new("title"), "Required").unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| manager.flush()));
    assert!(result.is_err());

    manager.add_property_error(&PropertyKey::new("other"), "Required").unwrap();
    assert_eq!(manager.flush(), 1);
    assert!(!manager.has_pending());
    assert!(!recorder.last().is_valid);
}

#[test]
fn test_pass_shares_error_snapshot() {
    let manager = ServerValidationManager::new();
    let pointers = Rc::new(RefCell::new(Vec::new()));
    for alias in ["title", "body"] {
        let pointers = pointers.clone();
        manager
            .subscribe(SubscriptionKey::property(alias), move |n| {
                pointers.borrow_mut().push(n.all_errors.as_ptr() as usize)
            })
            .unwrap();
    }
    manager.add_property_error(&PropertyKey::new("title"), "Required").unwrap();
    pointers.borrow_mut().clear();

    manager.flush();
    let pointers = pointers.borrow();
    assert_eq!(pointers.len(), 2);
    assert_eq!(pointers[0], pointers[1]);
}

#[test]
fn test_later_subscribers_see_changes_made_during_the_pass() {
    let manager = ServerValidationManager::new();
    let inner = manager.clone();
    manager
        .subscribe(SubscriptionKey::field("Name"), move |n| {
            if !n.is_valid && !inner.has_field_error("Alias") {
                inner.add_field_error("Alias", "Alias is required").unwrap();
            }
        })
        .unwrap();
    let recorder = Recorder::default();
    manager
        .subscribe(SubscriptionKey::field("Alias"), recorder.callback())
        .unwrap();

    manager.add_field_error("Name", "Name is required").unwrap();
    manager.flush();

    // the first recorded pass already reflects the error added by the first
    // subscriber
    let calls = recorder.calls.borrow();
    assert!(!calls[1].is_valid);
    assert_eq!(calls[1].all, 2);
}

#[test]
fn test_contains_subscription_reaches_nested_errors() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    let subscription = manager
        .subscribe(
            SubscriptionKey::property("AAA").with_match(MatchOptions::contains()),
            recorder.callback(),
        )
        .unwrap();

    assert_eq!(
        manager.property_subscriptions(&PropertyKey::new("blocks/AAA/city")),
        [subscription.id()]
    );
    assert!(manager
        .property_subscriptions(&PropertyKey::new("blocks/AAA"))
        .is_empty());
    assert!(manager
        .property_subscriptions(&PropertyKey::new("blocks/BBB/city"))
        .is_empty());

    manager
        .add_property_error(&PropertyKey::new("blocks/BBB/city"), "Required")
        .unwrap();
    manager.flush();
    assert!(recorder.last().is_valid);

    let nested = PropertyKey::new("blocks/AAA/city").with_field("value");
    manager.add_property_error(&nested, "Required").unwrap();
    manager.flush();
    let seen = recorder.last();
    assert!(!seen.is_valid);
    assert_eq!(seen.errors, ["Required"]);
}

#[test]
fn test_variant_subscriber_scoping() {
    let manager = ServerValidationManager::new();
    let da = Recorder::default();
    let en = Recorder::default();
    manager
        .subscribe(SubscriptionKey::variant(Some("da-DK"), None), da.callback())
        .unwrap();
    manager
        .subscribe(SubscriptionKey::variant(Some("en-US"), None), en.callback())
        .unwrap();

    manager
        .add_property_error(&PropertyKey::new("title").with_culture("da-DK"), "Påkrævet")
        .unwrap();
    manager.flush();

    assert!(!da.last().is_valid);
    assert!(en.last().is_valid);
    assert_eq!(da.last().culture.as_deref(), Some("da-DK"));
}

#[test]
fn test_subscription_lookup() {
    let manager = ServerValidationManager::new();
    let prefix = manager
        .subscribe(
            SubscriptionKey::property("blocks").with_match(MatchOptions::prefix()),
            |_| {},
        )
        .unwrap();
    let field = manager.subscribe(SubscriptionKey::field("Name"), |_| {}).unwrap();
    let culture = manager
        .subscribe(SubscriptionKey::variant(Some("da"), None), |_| {})
        .unwrap();

    assert_eq!(
        manager.property_subscriptions(&PropertyKey::new("blocks/AAA/city")),
        [prefix.id()]
    );
    assert_eq!(manager.field_subscriptions("Name"), [field.id()]);
    assert_eq!(manager.culture_subscriptions(Some("da")), [culture.id()]);
    assert_eq!(
        manager.variant_subscriptions(&Variant::new(Some("da"), None)),
        [culture.id()]
    );
}

#[test]
fn test_invalid_subscription_key() {
    let manager = ServerValidationManager::new();
    assert!(
        manager
            .subscribe(SubscriptionKey::field(""), |_| {})
            .unwrap_err()
            .is_missing_argument()
    );
    assert_eq!(manager.subscription_count(), 0);
}

#[test]
fn test_without_coalescing() {
    let config = ManagerConfig::default().with_coalesce_notifications(false);
    let manager = ServerValidationManager::with_config(config);
    manager.notify();
    manager.notify();
    assert_eq!(manager.flush(), 2);
}

#[tokio::test]
async fn test_next_tick_runs_pending_pass() {
    let manager = ServerValidationManager::new();
    let recorder = Recorder::default();
    manager
        .subscribe(SubscriptionKey::field("Name"), recorder.callback())
        .unwrap();
    manager.add_field_error("Name", "x").unwrap();

    let passes = tokio::time::timeout(std::time::Duration::from_secs(1), manager.next_tick())
        .await
        .expect("tick should run");
    assert_eq!(passes, 1);
    assert!(!recorder.last().is_valid);
}
