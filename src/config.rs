//! Caller-facing evaluator configuration, deserializable from whatever config format a
//! host process uses to assemble its plans.
//!
//! Grounded on `config.rs::Config` -- a plain `#[derive(Deserialize)]` struct tree with
//! no custom attributes or defaults, the teacher's consistent style for config values.

use serde::Deserialize;

use crate::operators::NullEqualityPolicy;

/// The construction-time knobs an `ExpressionEvaluator` needs beyond the plan itself.
/// Bundles what `evaluate_column` otherwise takes as separate arguments, for callers
/// that load evaluator settings from a config file alongside the rest of their setup.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    pub null_equality_policy: NullEqualityPolicy,
    /// Scratch width to preallocate per evaluator instance; `0` lets the plan's own
    /// `num_intermediates()` decide.
    #[serde(default)]
    pub intermediate_capacity_hint: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            null_equality_policy: NullEqualityPolicy::Unequal,
            intermediate_capacity_hint: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_json() {
        let config: EvaluatorConfig =
            serde_json::from_str(r#"{"null_equality_policy": "Equal"}"#).unwrap();
        assert_eq!(config.null_equality_policy, NullEqualityPolicy::Equal);
        assert_eq!(config.intermediate_capacity_hint, 0);
    }

    #[test]
    fn default_policy_treats_nulls_as_unequal() {
        assert_eq!(EvaluatorConfig::default().null_equality_policy, NullEqualityPolicy::Unequal);
    }
}
