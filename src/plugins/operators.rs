// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Built-in operators

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use super::{param_or, required_param, Operator, Params, PluginResult, StepInput};

/// Returns its `value` param, ignoring input
pub struct ConstOperator {
    value: Value,
}

impl ConstOperator {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn from_params(params: &Params) -> PluginResult<Self> {
        Ok(Self::new(required_param(params, "value")?))
    }
}

#[async_trait]
impl Operator for ConstOperator {
    async fn run(&self, _input: StepInput) -> PluginResult<Value> {
        Ok(self.value.clone())
    }
}

/// Sums numeric inputs.
///
/// Accepts a list of dependency results or a single array. The result is an
/// integer when every term is an integer.
pub struct SumOperator;

impl SumOperator {
    fn terms(input: &StepInput) -> Vec<&Value> {
        match input {
            StepInput::Single(Value::Array(items)) => items.iter().collect(),
            other => other.values(),
        }
    }
}

#[async_trait]
impl Operator for SumOperator {
    async fn run(&self, input: StepInput) -> PluginResult<Value> {
        let terms = Self::terms(&input);

        if let Some(ints) = terms.iter().map(|v| v.as_i64()).collect::<Option<Vec<_>>>() {
            let total = ints
                .into_iter()
                .try_fold(0i64, i64::checked_add)
                .context("integer overflow while summing")?;
            return Ok(Value::from(total));
        }

        let mut total = 0.0;
        for term in terms {
            total += term
                .as_f64()
                .with_context(|| format!("cannot sum non-numeric value {term}"))?;
        }
        Ok(Value::from(total))
    }
}

/// Logs its input and passes it through
pub struct ShowOperator {
    label: Option<String>,
}

impl ShowOperator {
    pub fn from_params(params: &Params) -> PluginResult<Self> {
        Ok(Self {
            label: param_or(params, "label", None)?,
        })
    }
}

#[async_trait]
impl Operator for ShowOperator {
    async fn run(&self, input: StepInput) -> PluginResult<Value> {
        let value = input.into_value();
        match &self.label {
            Some(label) => info!(label = %label, value = %value, "show"),
            None => info!(value = %value, "show"),
        }
        Ok(value)
    }
}

/// Writes its input as pretty JSON to `path` and passes it through
pub struct SaveJsonOperator {
    path: PathBuf,
}

impl SaveJsonOperator {
    pub fn from_params(params: &Params) -> PluginResult<Self> {
        Ok(Self {
            path: required_param(params, "path")?,
        })
    }
}

#[async_trait]
impl Operator for SaveJsonOperator {
    async fn run(&self, input: StepInput) -> PluginResult<Value> {
        let value = input.into_value();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&value)?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_const_requires_value() {
        assert!(ConstOperator::from_params(&Params::new()).is_err());

        let mut params = Params::new();
        params.insert("value".into(), json!({"k": 1}));
        let op = ConstOperator::from_params(&params).unwrap();
        assert_eq!(op.run(StepInput::Absent).await.unwrap(), json!({"k": 1}));
    }

    #[tokio::test]
    async fn test_sum() {
        let op = SumOperator;
        assert_eq!(
            op.run(StepInput::Many(vec![json!(2), json!(3)])).await.unwrap(),
            json!(5)
        );
        assert_eq!(
            op.run(StepInput::Single(json!([1, 2.5]))).await.unwrap(),
            json!(3.5)
        );
        assert_eq!(op.run(StepInput::Absent).await.unwrap(), json!(0));
        assert!(op.run(StepInput::Many(vec![json!("x")])).await.is_err());
    }

    #[tokio::test]
    async fn test_show_passes_through() {
        let op = ShowOperator::from_params(&Params::new()).unwrap();
        assert_eq!(
            op.run(StepInput::Single(json!([1]))).await.unwrap(),
            json!([1])
        );
    }

    #[tokio::test]
    async fn test_save_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/result.json");

        let mut params = Params::new();
        params.insert("path".into(), json!(path));
        let op = SaveJsonOperator::from_params(&params).unwrap();

        let value = op.run(StepInput::Single(json!({"a": 1}))).await.unwrap();
        assert_eq!(value, json!({"a": 1}));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"a": 1}));
    }
}
