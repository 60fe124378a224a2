//! FeatureStateStore - enabled/disabled flag fed by the external controller
//!
//! Initialized from persisted configuration at startup; afterwards only the
//! external change channel updates it. A malformed payload never crashes
//! anything: it is a no-op and the last-known state stands (absent values
//! default to enabled).

use serde_json::Value;

/// Per-scanner feature flag
#[derive(Debug, Clone)]
pub struct FeatureState {
    enabled: bool,
}

impl Default for FeatureState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FeatureState {
    /// Initialize from a persisted raw value; anything but a boolean reads
    /// as the default (enabled)
    pub fn from_raw(raw: Option<&Value>) -> Self {
        let enabled = match raw {
            Some(Value::Bool(value)) => *value,
            _ => true,
        };
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Apply an external change notification.
    ///
    /// Returns the new value only on a real boolean transition; malformed
    /// payloads and same-value updates return `None` so the caller reacts
    /// to transitions alone.
    pub fn apply_raw(&mut self, raw: &Value) -> Option<bool> {
        match raw {
            Value::Bool(value) if *value != self.enabled => {
                self.enabled = *value;
                Some(*value)
            }
            _ => None,
        }
    }

    /// Direct transition (used by the orchestrator once a raw payload has
    /// been accepted)
    pub fn set(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

// ==================== TESTS ====================
