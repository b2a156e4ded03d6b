// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Built-in data sources

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use super::{required_param, DataSource, Params, PluginResult};

/// Returns the `data` param (null when absent)
pub struct InlineSource {
    data: Value,
}

impl InlineSource {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(params.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl DataSource for InlineSource {
    async fn fetch(&self) -> PluginResult<Value> {
        Ok(self.data.clone())
    }
}

/// Reads and parses the JSON file at `path`
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn from_params(params: &Params) -> PluginResult<Self> {
        Ok(Self {
            path: required_param(params, "path")?,
        })
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn fetch(&self) -> PluginResult<Value> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))
    }
}
