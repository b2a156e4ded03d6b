// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Built-in schedulers

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{param_or, Dispatcher, Params, PluginResult, Scheduler};

const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Runs its pipeline at a fixed interval.
///
/// Config: `seconds` (default 10) or `millis`, and `run_immediately`
/// (default false) to fire once as soon as the scheduler starts. A run that
/// overruns the interval delays the next tick instead of queueing a burst.
/// Stopping ends the loop at the next tick; a run already underway finishes.
pub struct IntervalScheduler {
    pipeline: PathBuf,
    period: Duration,
    run_immediately: bool,
    dispatcher: Option<Dispatcher>,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl IntervalScheduler {
    pub fn new(pipeline: impl Into<PathBuf>, period: Duration) -> Self {
        Self {
            pipeline: pipeline.into(),
            period,
            run_immediately: false,
            dispatcher: None,
            stop: None,
            task: None,
        }
    }

    pub fn from_config(config: &Params, pipeline: &Path) -> PluginResult<Self> {
        let period = match param_or::<Option<u64>>(config, "millis", None)? {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs(param_or(config, "seconds", DEFAULT_INTERVAL_SECS)?),
        };
        anyhow::ensure!(!period.is_zero(), "interval must be greater than zero");

        let mut scheduler = Self::new(pipeline, period);
        scheduler.run_immediately = param_or(config, "run_immediately", false)?;
        Ok(scheduler)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the timer loop is running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Job id derived from the pipeline path
    fn job_id(&self) -> String {
        self.pipeline.to_string_lossy().replace(['/', '\\'], "_")
    }
}

impl Scheduler for IntervalScheduler {
    fn register(&mut self, dispatcher: Dispatcher) -> PluginResult<()> {
        debug!(job = %self.job_id(), "registered interval job");
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    fn start(&mut self) -> PluginResult<()> {
        let dispatcher = self
            .dispatcher
            .clone()
            .ok_or_else(|| anyhow::anyhow!("scheduler for {} started before register", self.pipeline.display()))?;

        if self.is_running() {
            return Ok(());
        }

        let period = self.period;
        let run_immediately = self.run_immediately;

        info!(
            job = %self.job_id(),
            every_ms = period.as_millis() as u64,
            "starting interval scheduler"
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately.
            ticker.tick().await;
            if run_immediately {
                dispatcher.dispatch().await;
            }

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => dispatcher.dispatch().await,
                }
            }
        }));
        self.stop = Some(stop_tx);

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        if self.task.take().is_some() {
            debug!(job = %self.job_id(), "stopped interval scheduler");
        }
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_dispatcher(hits: &Arc<AtomicUsize>) -> Dispatcher {
        let hits = Arc::clone(hits);
        Dispatcher::new("pipelines/p.yaml", move || {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[test]
    fn test_from_config() {
        let config = json!({"seconds": 5}).as_object().cloned().unwrap();
        let scheduler = IntervalScheduler::from_config(&config, Path::new("p.yaml")).unwrap();
        assert_eq!(scheduler.period(), Duration::from_secs(5));

        let scheduler = IntervalScheduler::from_config(&Params::new(), Path::new("p.yaml")).unwrap();
        assert_eq!(scheduler.period(), Duration::from_secs(DEFAULT_INTERVAL_SECS));

        let config = json!({"millis": 0}).as_object().cloned().unwrap();
        assert!(IntervalScheduler::from_config(&config, Path::new("p.yaml")).is_err());
    }

    #[test]
    fn test_job_id() {
        let scheduler = IntervalScheduler::new("pipelines/daily.yaml", Duration::from_secs(1));
        assert_eq!(scheduler.job_id(), "pipelines_daily.yaml");
    }

    #[tokio::test]
    async fn test_start_requires_register() {
        let mut scheduler = IntervalScheduler::new("p.yaml", Duration::from_millis(10));
        assert!(scheduler.start().is_err());
    }

    #[tokio::test]
    async fn test_stop_lets_running_dispatch_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        let slow = Dispatcher::new("p.yaml", move || {
            let (s, f) = (Arc::clone(&s), Arc::clone(&f));
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        let mut scheduler = IntervalScheduler::new("p.yaml", Duration::from_secs(60));
        scheduler.run_immediately = true;
        scheduler.register(slow).unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        scheduler.stop();
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatches_on_interval_until_stopped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut scheduler = IntervalScheduler::new("p.yaml", Duration::from_millis(20));
        scheduler.register(counting_dispatcher(&hits)).unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop();
        assert!(!scheduler.is_running());

        let seen = hits.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected at least one dispatch, got {seen}");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }
}
