//! Subscriptions binding callbacks to coordinates.

use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::error::ValidationError;
use crate::matcher::{MatchOptions, path_matches};
use crate::model::{
    ErrorEntry, INVARIANT_CULTURE, PropertyKey, Variant, normalize_culture, normalize_field,
    normalize_segment,
};

/// Unique identifier minted for every subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arguments passed to a subscriber.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    /// `true` when nothing matches the subscribed coordinate.
    pub is_valid: bool,
    /// Entries matching the subscribed coordinate.
    pub errors: &'a [ErrorEntry],
    /// Every entry in the store.
    pub all_errors: &'a [ErrorEntry],
    /// Culture the subscriber listens on; `None` on reset.
    pub culture: Option<&'a str>,
    /// Segment the subscriber listens on.
    pub segment: Option<&'a str>,
}

/// Subscriber callback.
pub type Callback = Rc<dyn Fn(&Notification<'_>)>;

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
    /// A native field error.
    Field { field_name: String },
    /// A property (or validation path), optionally one sub-field of it.
    Property {
        alias: String,
        field_name: Option<String>,
        options: MatchOptions,
    },
    /// A whole variant.
    Variant,
}

/// Coordinate a subscription is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKey {
    pub target: SubscriptionTarget,
    pub culture: String,
    pub segment: Option<String>,
}

impl SubscriptionKey {
    /// Listens to a native field error.
    pub fn field(field_name: impl Into<String>) -> Self {
        Self {
            target: SubscriptionTarget::Field {
                field_name: field_name.into(),
            },
            culture: INVARIANT_CULTURE.to_string(),
            segment: None,
        }
    }

    /// Listens to a property in the invariant culture.
    pub fn property(alias: impl Into<String>) -> Self {
        Self {
            target: SubscriptionTarget::Property {
                alias: alias.into(),
                field_name: None,
                options: MatchOptions::default(),
            },
            culture: INVARIANT_CULTURE.to_string(),
            segment: None,
        }
    }

    /// Listens to a whole variant.
    pub fn variant(culture: Option<&str>, segment: Option<&str>) -> Self {
        Self {
            target: SubscriptionTarget::Variant,
            culture: normalize_culture(culture),
            segment: normalize_segment(segment),
        }
    }

    /// Classifies a nullable coordinate.
    ///
    /// - alias set: property subscription
    /// - no alias, field set: field subscription
    /// - neither: variant subscription
    pub fn from_coordinate(
        property_alias: Option<&str>,
        culture: Option<&str>,
        field_name: Option<&str>,
        segment: Option<&str>,
        options: MatchOptions,
    ) -> Self {
        let target = match (property_alias, normalize_field(field_name)) {
            (Some(alias), field_name) => SubscriptionTarget::Property {
                alias: alias.to_string(),
                field_name,
                options,
            },
            (None, Some(field_name)) => SubscriptionTarget::Field { field_name },
            (None, None) => SubscriptionTarget::Variant,
        };
        Self {
            target,
            culture: normalize_culture(culture),
            segment: normalize_segment(segment),
        }
    }

    pub fn with_culture(mut self, culture: &str) -> Self {
        self.culture = normalize_culture(Some(culture));
        self
    }

    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = normalize_segment(Some(segment));
        self
    }

    /// Narrows a property subscription to one sub-field.
    pub fn with_field(mut self, field: &str) -> Self {
        if let SubscriptionTarget::Property { field_name, .. } = &mut self.target {
            *field_name = normalize_field(Some(field));
        }
        self
    }

    /// Sets the match options of a property subscription.
    pub fn with_match(mut self, match_options: MatchOptions) -> Self {
        if let SubscriptionTarget::Property { options, .. } = &mut self.target {
            *options = match_options;
        }
        self
    }

    pub fn variant_of(&self) -> Variant {
        Variant {
            culture: self.culture.clone(),
            segment: self.segment.clone(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match &self.target {
            SubscriptionTarget::Field { field_name } if field_name.is_empty() => {
                Err(ValidationError::MissingArgument("field_name"))
            }
            SubscriptionTarget::Property { alias, .. } if alias.is_empty() => {
                Err(ValidationError::MissingArgument("property_alias"))
            }
            _ => Ok(()),
        }
    }

    /// Coordinate equality used for bulk removal. Match options are ignored.
    fn same_coordinate(&self, other: &SubscriptionKey) -> bool {
        if self.culture != other.culture || self.segment != other.segment {
            return false;
        }
        match (&self.target, &other.target) {
            (
                SubscriptionTarget::Field { field_name: a },
                SubscriptionTarget::Field { field_name: b },
            ) => a == b,
            (
                SubscriptionTarget::Property {
                    alias: a,
                    field_name: fa,
                    ..
                },
                SubscriptionTarget::Property {
                    alias: b,
                    field_name: fb,
                    ..
                },
            ) => a == b && fa == fb,
            (SubscriptionTarget::Variant, SubscriptionTarget::Variant) => true,
            _ => false,
        }
    }
}

/// A registered callback.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriptionId,
    key: SubscriptionKey,
    callback: Callback,
}

impl Subscriber {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub(crate) fn invoke(&self, notification: &Notification<'_>) {
        (self.callback)(notification)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Registered subscribers in subscription order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscribers: Vec<Subscriber>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback and returns its new id.
    pub fn insert(&mut self, key: SubscriptionKey, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers.push(Subscriber { id, key, callback });
        id
    }

    /// Removes the subscriber with `id`. Returns `false` if it was not found.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }

    /// Removes every subscriber bound to exactly `key`.
    ///
    /// Match options are not taken into account, neither on `key` nor on the
    /// registered subscribers.
    pub fn remove_at(&mut self, key: &SubscriptionKey) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| !s.key.same_coordinate(key));
        before - self.subscribers.len()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<&Subscriber> {
        self.subscribers.iter().find(|s| s.id == id)
    }

    /// Clones the current subscriber list.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.clone()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Property subscribers that should hear about an error at `key`.
    ///
    /// The incoming path is tested against each subscriber's alias and match
    /// type. Subscribers without a field, and any subscriber using a partial
    /// match type, accept every field.
    pub fn property_subscribers(&self, key: &PropertyKey) -> Vec<&Subscriber> {
        self.subscribers
            .iter()
            .filter(|s| match &s.key.target {
                SubscriptionTarget::Property {
                    alias,
                    field_name,
                    options,
                } => {
                    path_matches(&key.alias, alias, options.match_type)
                        && s.key.culture == key.culture
                        && s.key.segment == key.segment
                        && (options.is_partial()
                            || field_name.is_none()
                            || *field_name == key.field)
                }
                _ => false,
            })
            .collect()
    }

    /// Field subscribers for `field_name` in the invariant culture.
    pub fn field_subscribers(&self, field_name: &str) -> Vec<&Subscriber> {
        self.subscribers
            .iter()
            .filter(|s| {
                matches!(&s.key.target, SubscriptionTarget::Field { field_name: f } if f == field_name)
                    && s.key.culture == INVARIANT_CULTURE
                    && s.key.segment.is_none()
            })
            .collect()
    }

    /// Variant subscribers bound to exactly `variant`.
    pub fn variant_subscribers(&self, variant: &Variant) -> Vec<&Subscriber> {
        self.subscribers
            .iter()
            .filter(|s| {
                s.key.target == SubscriptionTarget::Variant
                    && s.key.culture == variant.culture
                    && s.key.segment == variant.segment
            })
            .collect()
    }

    /// Variant subscribers bound to `culture` with no segment.
    pub fn culture_subscribers(&self, culture: Option<&str>) -> Vec<&Subscriber> {
        self.variant_subscribers(&Variant::new(culture, None))
    }
}
