// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Shared event trigger instances
//!
//! Pipelines declaring structurally identical `event` blocks share one
//! trigger. The table maps a dedup key to the live trigger and the paths of
//! every pipeline subscribed to it.

use blake3::Hasher;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::pipeline::{run_file, EventSpec, ParamOverrides};
use crate::plugins::{Emitter, Event, EventTrigger, PluginResult, StepInput};
use crate::registry::Registry;

/// Pipeline paths subscribed to one trigger, in subscription order
pub type Subscribers = Arc<RwLock<Vec<PathBuf>>>;

/// Stable key for an event spec, independent of config key order
pub fn dedup_key(spec: &EventSpec) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"type\0");
    hasher.update(spec.kind.as_bytes());
    hasher.update(b"\0config\0");

    let mut encoded = String::new();
    canonical(&Value::Object(spec.config.clone()), &mut encoded);
    hasher.update(encoded.as_bytes());

    hasher.finalize().to_hex().to_string()
}

/// JSON with object keys sorted at every level.
///
/// Integral floats render as integers, so `1` and `1.0` encode the same.
fn canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                out.push_str(&(f as i64).to_string())
            }
            _ => out.push_str(&n.to_string()),
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// A live trigger and its subscribers
pub struct EventInstance {
    kind: String,
    trigger: Box<dyn EventTrigger>,
    subscribers: Subscribers,
    started: bool,
}

impl EventInstance {
    /// Wire `trigger` so each emitted event runs every subscribed pipeline.
    ///
    /// `defaults` are applied to every run, below the event's own overrides.
    pub fn new(
        kind: impl Into<String>,
        mut trigger: Box<dyn EventTrigger>,
        registry: Arc<Registry>,
        defaults: ParamOverrides,
    ) -> Self {
        let subscribers: Subscribers = Arc::new(RwLock::new(Vec::new()));
        trigger.set_emitter(fan_out(registry, Arc::clone(&subscribers), defaults));

        Self {
            kind: kind.into(),
            trigger,
            subscribers,
            started: false,
        }
    }

    /// Add `path` to the subscribers; returns false if it was already there
    pub async fn subscribe(&self, path: &Path) -> bool {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.iter().any(|p| p == path) {
            return false;
        }
        subscribers.push(path.to_path_buf());
        true
    }

    /// Snapshot of the subscribed paths
    pub async fn subscribers(&self) -> Vec<PathBuf> {
        self.subscribers.read().await.clone()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Start the trigger once; later calls are no-ops
    pub fn start(&mut self) -> PluginResult<()> {
        if !self.started {
            self.trigger.start()?;
            self.started = true;
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.started {
            self.trigger.stop();
            self.started = false;
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

fn fan_out(registry: Arc<Registry>, subscribers: Subscribers, defaults: ParamOverrides) -> Emitter {
    Emitter::new(move |event: Event| {
        let registry = Arc::clone(&registry);
        let subscribers = Arc::clone(&subscribers);
        let mut overrides = defaults.clone();

        async move {
            overrides.merge(event.overrides);
            let paths = subscribers.read().await.clone();
            debug!(subscribers = paths.len(), "event fired");

            for path in paths {
                let input = StepInput::Single(event.payload.clone());
                match run_file(Arc::clone(&registry), &path, input, overrides.clone()).await {
                    Ok(results) => info!(
                        pipeline = %path.display(),
                        steps = results.len(),
                        "event-triggered run finished"
                    ),
                    Err(err) => error!(
                        pipeline = %path.display(),
                        error = %err,
                        "event-triggered run failed"
                    ),
                }
            }
        }
    })
}

/// Dedup key → live trigger
#[derive(Default)]
pub struct EventTable {
    instances: HashMap<String, EventInstance>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&EventInstance> {
        self.instances.get(key)
    }

    pub fn insert(&mut self, key: String, instance: EventInstance) -> &EventInstance {
        self.instances.entry(key).or_insert(instance)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Start every instance that has not been started yet
    pub fn start_all(&mut self) -> PluginResult<()> {
        for (key, instance) in &mut self.instances {
            debug!(kind = %instance.kind(), key = %key, "starting event trigger");
            instance.start()?;
        }
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for instance in self.instances.values_mut() {
            instance.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: &str, config: Value) -> EventSpec {
        EventSpec {
            kind: kind.to_string(),
            config: config.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_dedup_key_ignores_key_order() {
        let a = spec("LocalFile", json!({"path": "in", "opts": {"x": 1, "y": [1, 2]}}));
        let b = spec("LocalFile", json!({"opts": {"y": [1, 2], "x": 1}, "path": "in"}));
        assert_eq!(dedup_key(&a), dedup_key(&b));
        assert_eq!(dedup_key(&a).len(), 64);
    }

    #[test]
    fn test_dedup_key_distinguishes_content() {
        let a = spec("LocalFile", json!({"path": "in"}));
        assert_ne!(dedup_key(&a), dedup_key(&spec("LocalFile", json!({"path": "out"}))));
        assert_ne!(dedup_key(&a), dedup_key(&spec("Webhook", json!({"path": "in"}))));
        assert_ne!(
            dedup_key(&spec("LocalFile", json!({"opts": [1, 2]}))),
            dedup_key(&spec("LocalFile", json!({"opts": [2, 1]})))
        );
    }

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let mut out = String::new();
        canonical(&json!({"b": {"d": null, "c": "s"}, "a": [true, 1.5]}), &mut out);
        assert_eq!(out, r#"{"a":[true,1.5],"b":{"c":"s","d":null}}"#);
    }

    #[test]
    fn test_dedup_key_treats_integral_floats_as_integers() {
        let int = spec("Interval", json!({"n": 1, "nested": [2]}));
        let float = spec("Interval", json!({"n": 1.0, "nested": [2.0]}));
        assert_eq!(dedup_key(&int), dedup_key(&float));

        let fraction = spec("Interval", json!({"n": 1.5, "nested": [2]}));
        assert_ne!(dedup_key(&int), dedup_key(&fraction));
    }

    struct Inert {
        starts: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl EventTrigger for Inert {
        fn set_emitter(&mut self, _emitter: Emitter) {}

        fn start(&mut self) -> PluginResult<()> {
            self.starts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_instance_subscribes_once_and_starts_once() {
        let starts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let trigger = Box::new(Inert {
            starts: Arc::clone(&starts),
        });
        let mut instance = EventInstance::new(
            "Inert",
            trigger,
            Arc::new(Registry::new()),
            ParamOverrides::default(),
        );

        assert!(instance.subscribe(Path::new("a.yaml")).await);
        assert!(instance.subscribe(Path::new("b.yaml")).await);
        assert!(!instance.subscribe(Path::new("a.yaml")).await);
        assert_eq!(
            instance.subscribers().await,
            vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
        );

        instance.start().unwrap();
        instance.start().unwrap();
        assert!(instance.is_started());
        assert_eq!(starts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
