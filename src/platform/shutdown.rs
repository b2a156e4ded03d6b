// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Shutdown signalling

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::Lifecycle;

/// Cloneable handle that ends a running [`Platform`](super::Platform).
///
/// The first signal wins; later ones are ignored.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<Option<Lifecycle>>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request an orderly shutdown
    pub fn trigger(&self) {
        self.signal(Lifecycle::ShutdownRequested);
    }

    /// Record an external interrupt (Ctrl-C)
    pub(crate) fn interrupt(&self) {
        self.signal(Lifecycle::Interrupted);
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Resolve once a shutdown has been signalled, with its cause
    pub async fn wait(&self) -> Lifecycle {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Lifecycle::ShutdownRequested;
            }
        }
    }

    /// Spawn a task that turns Ctrl-C into an interrupt
    pub(crate) fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => handle.interrupt(),
                Err(err) => warn!(error = %err, "unable to listen for Ctrl-C"),
            }
        })
    }

    fn signal(&self, outcome: Lifecycle) {
        let changed = self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(outcome);
            true
        });
        if changed {
            debug!(?outcome, "shutdown signalled");
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
