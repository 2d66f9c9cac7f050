//! Server validation error registry.
//!
//! Stores validation errors reported by the server for content editing
//! forms, answers hierarchical queries over them and notifies subscribed
//! widgets when they change. Errors of complex editors, whose value is a tree
//! of blocks, are flattened into entries addressed by validation paths such as
//! `blocks/AAA/city`.
//!
//! Nothing here decides whether a value is valid; it only keeps and
//! rebroadcasts the server's verdicts.

pub mod config;
pub mod decompose;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod subscription;

mod manager;

pub use config::ManagerConfig;
pub use error::{DecodeError, ValidationError};
pub use manager::*;
pub use matcher::{MatchOptions, MatchType};
pub use subscription::{Notification, SubscriptionId, SubscriptionKey, SubscriptionTarget};
