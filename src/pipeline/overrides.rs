// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Runtime parameter overrides
//!
//! Overrides replace values of params a step already declares; they never add
//! new params. Two addressing modes coexist:
//!
//! - global, keyed by param name, applied to every step declaring that param
//! - step-scoped, keyed by step id then param name, applied to that step only
//!
//! For a given step a step-scoped value wins over a global one.

use serde_json::Value;
use std::collections::HashMap;

use crate::plugins::Params;

/// Parameter overrides applied when a step is instantiated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    global: Params,
    scoped: HashMap<String, Params>,
}

impl ParamOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides keyed by param name
    pub fn global(params: Params) -> Self {
        Self {
            global: params,
            scoped: HashMap::new(),
        }
    }

    /// Overrides keyed by step id, each mapping to that step's param overrides.
    ///
    /// Entries whose value is not a mapping address no step and are ignored.
    pub fn per_step(mapping: &Params) -> Self {
        let scoped = mapping
            .iter()
            .filter_map(|(step, value)| {
                value
                    .as_object()
                    .map(|params| (step.clone(), params.clone()))
            })
            .collect();

        Self {
            global: Params::new(),
            scoped,
        }
    }

    /// Set a global override
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.global.insert(key.into(), value);
        self
    }

    /// Set an override scoped to `step`
    pub fn set_for_step(
        &mut self,
        step: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> &mut Self {
        self.scoped
            .entry(step.into())
            .or_default()
            .insert(key.into(), value);
        self
    }

    /// Layer `other` on top of these overrides; `other` wins on conflicts
    pub fn merge(&mut self, other: ParamOverrides) {
        self.global.extend(other.global);
        for (step, params) in other.scoped {
            self.scoped.entry(step).or_default().extend(params);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.values().all(Params::is_empty)
    }

    /// Effective params for step `step_id` declaring `params`
    pub fn apply(&self, step_id: &str, params: &Params) -> Params {
        let scoped = self.scoped.get(step_id);
        params
            .iter()
            .map(|(key, value)| {
                let effective = scoped
                    .and_then(|s| s.get(key))
                    .or_else(|| self.global.get(key))
                    .unwrap_or(value);
                (key.clone(), effective.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_global_applies_to_every_step_with_the_param() {
        let overrides = ParamOverrides::global(params(json!({"y": 999})));

        assert_eq!(
            overrides.apply("step1", &params(json!({"x": 1}))),
            params(json!({"x": 1}))
        );
        assert_eq!(
            overrides.apply("step2", &params(json!({"y": 2}))),
            params(json!({"y": 999}))
        );
        assert_eq!(
            overrides.apply("step3", &params(json!({"y": 3, "z": 0}))),
            params(json!({"y": 999, "z": 0}))
        );
    }

    #[test]
    fn test_overrides_never_add_params() {
        let overrides = ParamOverrides::global(params(json!({"extra": true})));
        assert!(overrides.apply("s", &Params::new()).is_empty());
    }

    #[test]
    fn test_scoped_applies_to_one_step_and_wins() {
        let mut overrides = ParamOverrides::per_step(&params(json!({
            "a": {"value": 10},
            "final": {}
        })));
        overrides.set("value", json!(1));

        let declared = params(json!({"value": 2}));
        assert_eq!(overrides.apply("a", &declared), params(json!({"value": 10})));
        assert_eq!(overrides.apply("b", &declared), params(json!({"value": 1})));
    }

    #[test]
    fn test_per_step_ignores_non_mapping_entries() {
        let overrides = ParamOverrides::per_step(&params(json!({"file_path": "/tmp/x.csv"})));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = ParamOverrides::new();
        base.set("x", json!(1)).set_for_step("s", "y", json!(1));

        let mut top = ParamOverrides::new();
        top.set("x", json!(2)).set_for_step("s", "y", json!(2));

        base.merge(top);
        assert_eq!(
            base.apply("s", &params(json!({"x": 0, "y": 0}))),
            params(json!({"x": 2, "y": 2}))
        );
    }
}
