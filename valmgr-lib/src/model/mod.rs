//! Data model: stored entries, their coordinates and the inbound payloads.

mod block;
mod entry;
mod key;
mod model_state;

pub use block::*;
pub use entry::*;
pub use key::*;
pub use model_state::*;
