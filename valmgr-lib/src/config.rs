//! Manager configuration

use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_MAX_BLOCK_DEPTH;

/// Configuration for a [`ServerValidationManager`](crate::ServerValidationManager).
///
/// # Example
///
/// ```
/// use valmgr_lib::ManagerConfig;
///
/// let config = ManagerConfig::default()
///     .with_max_block_depth(8)
///     .with_coalesce_notifications(false);
/// assert_eq!(config.max_block_depth, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum nesting of complex editor payloads decoded from messages.
    ///
    /// Deeper payloads are skipped; the message holding them is still blanked.
    ///
    /// Default: 32
    pub max_block_depth: usize,

    /// Merge back-to-back notification requests into a single pass.
    ///
    /// Default: true
    pub coalesce_notifications: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
            coalesce_notifications: true,
        }
    }
}

impl ManagerConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum payload nesting.
    pub fn with_max_block_depth(mut self, depth: usize) -> Self {
        self.max_block_depth = depth;
        self
    }

    /// Enables or disables notification coalescing.
    pub fn with_coalesce_notifications(mut self, coalesce: bool) -> Self {
        self.coalesce_notifications = coalesce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ManagerConfig = serde_json::from_str(r#"{"max_block_depth": 4}"#).unwrap();
        assert_eq!(config.max_block_depth, 4);
        assert!(config.coalesce_notifications);
    }
}
