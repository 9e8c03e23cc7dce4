use serde::{Deserialize, Serialize};

/// Hard ceiling for `max_pending`
pub const MAX_PENDING_LIMIT: usize = 128;
/// Floor for `pending_action_timeout`
pub const MIN_PENDING_TIMEOUT: f64 = 0.5;

/// Tunables for the action sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Maximum unacknowledged actions (1..=128)
    pub max_pending: usize,
    /// Seconds between two accepted sends of the same action type
    pub min_action_interval: f64,
    pub enable_input_validation: bool,
    /// Seconds before an unacknowledged action is reported lost
    pub pending_action_timeout: f64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_pending: 32,
            min_action_interval: 0.05,
            enable_input_validation: true,
            pending_action_timeout: 5.0,
        }
    }
}

impl SenderConfig {
    /// Copy with every field forced into its valid range
    pub fn clamped(&self) -> Self {
        let min_action_interval = if self.min_action_interval.is_finite() {
            self.min_action_interval.max(0.0)
        } else {
            0.0
        };
        let pending_action_timeout = if self.pending_action_timeout.is_finite() {
            self.pending_action_timeout.max(MIN_PENDING_TIMEOUT)
        } else {
            MIN_PENDING_TIMEOUT
        };
        Self {
            max_pending: self.max_pending.clamp(1, MAX_PENDING_LIMIT),
            min_action_interval,
            enable_input_validation: self.enable_input_validation,
            pending_action_timeout,
        }
    }
}
