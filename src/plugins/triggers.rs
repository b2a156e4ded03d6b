// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Built-in event triggers

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use glob::Pattern;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{param_or, Emitter, Event, EventTrigger, Params, PluginResult};

const DEFAULT_PATTERN: &str = "*.csv";
const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Fires when a file matching `pattern` changes in the watched directory.
///
/// Config:
/// - `path`: directory to watch, non-recursively (default `.`)
/// - `pattern`: glob matched against the file name (default `*.csv`)
/// - `debounce_ms`: quiet period before a change is reported (default 2000)
/// - `inject`: step ids that receive the changed path as their `file_path` param
///
/// The event payload is `{"file_path": "<changed path>"}`. Stopping drops
/// pending changes; an emission already underway finishes.
pub struct LocalFileTrigger {
    dir: PathBuf,
    debounce: Duration,
    rule: ChangeRule,
    emitter: Option<Emitter>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl LocalFileTrigger {
    pub fn new(dir: impl Into<PathBuf>, pattern: &str) -> PluginResult<Self> {
        Ok(Self {
            dir: dir.into(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            rule: ChangeRule {
                pattern: Pattern::new(pattern)
                    .with_context(|| format!("invalid pattern '{pattern}'"))?,
                inject: Vec::new(),
            },
            emitter: None,
            debouncer: None,
            stop: None,
            task: None,
        })
    }

    /// Build from the event `config` block; the pipeline path is unused
    pub fn from_config(config: &Params, _pipeline: &Path) -> PluginResult<Self> {
        let dir: PathBuf = param_or(config, "path", PathBuf::from("."))?;
        let pattern: String = param_or(config, "pattern", DEFAULT_PATTERN.to_string())?;

        let mut trigger = Self::new(dir, &pattern)?;
        trigger.debounce = Duration::from_millis(param_or(config, "debounce_ms", DEFAULT_DEBOUNCE_MS)?);
        trigger.rule.inject = param_or(config, "inject", Vec::new())?;
        Ok(trigger)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn inject_into(mut self, step: impl Into<String>) -> Self {
        self.rule.inject.push(step.into());
        self
    }

    /// Whether the file name of `path` matches the configured pattern
    pub fn matches(&self, path: &Path) -> bool {
        self.rule.matches(path)
    }

    /// Event fired for a change to `path`
    pub fn event_for(&self, path: &Path) -> Event {
        self.rule.event_for(path)
    }

    pub fn is_watching(&self) -> bool {
        self.debouncer.is_some()
    }
}

impl EventTrigger for LocalFileTrigger {
    fn set_emitter(&mut self, emitter: Emitter) {
        self.emitter = Some(emitter);
    }

    fn start(&mut self) -> PluginResult<()> {
        let emitter = self
            .emitter
            .clone()
            .context("file trigger started without an emitter")?;

        if self.is_watching() {
            return Ok(());
        }

        // Channel from the blocking notify callback into the async world.
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut debouncer = new_debouncer(self.debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    if matches!(event.kind, DebouncedEventKind::Any) && tx.send(event.path).is_err() {
                        return;
                    }
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        })
        .context("failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", self.dir.display()))?;

        info!(
            path = %self.dir.display(),
            pattern = %self.rule.pattern,
            "watching for file changes"
        );

        let rule = self.rule.clone();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.task = Some(tokio::spawn(async move {
            loop {
                let path = tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    path = rx.recv() => match path {
                        Some(path) => path,
                        None => break,
                    },
                };
                if !rule.matches(&path) || path.is_dir() {
                    continue;
                }
                info!(file = %path.display(), "file changed");
                emitter.emit(rule.event_for(&path)).await;
            }
            debug!("file watcher loop ended");
        }));
        self.debouncer = Some(debouncer);
        self.stop = Some(stop_tx);

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        if self.debouncer.take().is_some() {
            debug!(path = %self.dir.display(), "stopped watching");
        }
        self.task = None;
    }
}

#[derive(Clone)]
struct ChangeRule {
    pattern: Pattern,
    inject: Vec<String>,
}

impl ChangeRule {
    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.pattern.matches(name))
    }

    fn event_for(&self, path: &Path) -> Event {
        let file_path = path.to_string_lossy().into_owned();
        self.inject.iter().fold(
            Event::new(json!({ "file_path": file_path })),
            |event, step| event.with_step_override(step, "file_path", json!(file_path)),
        )
    }
}

impl Drop for LocalFileTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}
