use serde::{Deserialize, Serialize};

/// How a task error affects its siblings and the steps after it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Finalize the step on the first error and run no further steps.
    StopImmediately,
    /// Let every task of the failing step finish, then stop.
    #[default]
    StopAfterStep,
    /// Keep running steps regardless of errors.
    NeverStop,
}

impl ErrorPolicy {
    /// Whether a step may finalize before all of its tasks reported.
    pub fn finalizes_early(self) -> bool {
        matches!(self, ErrorPolicy::StopImmediately)
    }

    /// Whether a step result with errors halts the flow.
    pub fn halts_on_error(self) -> bool {
        !matches!(self, ErrorPolicy::NeverStop)
    }
}

/// Configuration for a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub error_policy: ErrorPolicy,
    pub event_buffer_size: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            event_buffer_size: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorPolicy::StopImmediately).unwrap();
        assert_eq!(json, "\"stop_immediately\"");

        let parsed: ErrorPolicy = serde_json::from_str("\"never_stop\"").unwrap();
        assert_eq!(parsed, ErrorPolicy::NeverStop);
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: FlowConfig = serde_json::from_str(r#"{"error_policy": "never_stop"}"#).unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::NeverStop);
        assert_eq!(config.event_buffer_size, 1000);
    }
}
