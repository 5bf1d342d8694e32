// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic expiry scanner.
//!
//! Certificates expire without any object changing, so no watch event ever announces
//! that a certificate crossed its horizon. [`ExpiryScanner`] lists every `SSL` in every
//! namespace on a fixed interval and sends one reconcile request per resource into a
//! bounded channel that the controller consumes.
//!
//! Sends block when the channel is full: a slow controller stalls the scan instead of
//! losing requests. Every wait observes the shutdown token.

use crate::constants::MAX_CONFIGURED_DURATION_SECS;
use crate::crd::SSL;
use crate::metrics;
use crate::store::{ObjectStore, StoreError};
use kube::runtime::reflector::ObjectRef;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reasons a scan pass stopped early.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan cancelled by shutdown")]
    Cancelled,

    #[error("reconcile request channel closed")]
    ChannelClosed,

    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] StoreError),
}

/// Summary of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Namespaces visited, including the ones whose listing failed.
    pub namespaces: usize,
    /// Reconcile requests sent.
    pub emitted: usize,
    /// Namespaces skipped because listing their `SSL` resources failed.
    pub failed_namespaces: Vec<String>,
}

/// Background task that re-triggers every `SSL` on an interval.
pub struct ExpiryScanner {
    store: Arc<dyn ObjectStore>,
    interval: Duration,
    requests: mpsc::Sender<ObjectRef<SSL>>,
    shutdown: CancellationToken,
}

impl ExpiryScanner {
    /// `interval` is clamped to between 1ms and 365 days.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        interval: Duration,
        requests: mpsc::Sender<ObjectRef<SSL>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            interval: interval.clamp(
                Duration::from_millis(1),
                Duration::from_secs(MAX_CONFIGURED_DURATION_SECS),
            ),
            requests,
            shutdown,
        }
    }

    /// Scan every `interval` until shutdown or until the controller stops consuming.
    ///
    /// The first scan happens one interval after start; the controller's initial list
    /// already reconciles every resource once.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "Starting periodic expiry scanner");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.scan_once().await {
                Ok(report) => info!(
                    namespaces = report.namespaces,
                    emitted = report.emitted,
                    failed_namespaces = ?report.failed_namespaces,
                    "Expiry scan complete"
                ),
                Err(ScanError::ListNamespaces(err)) => {
                    warn!(error = %err, "Expiry scan skipped, namespaces could not be listed");
                }
                Err(ScanError::Cancelled) => break,
                Err(ScanError::ChannelClosed) => {
                    warn!("Reconcile request channel closed, stopping expiry scanner");
                    return;
                }
            }
        }

        info!("Periodic expiry scanner stopped");
    }

    /// Run a single scan pass.
    ///
    /// A namespace whose `SSL` list fails is recorded in the report and skipped.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Cancelled`] if shutdown fires, including while blocked on a send
    /// - [`ScanError::ChannelClosed`] if the receiving side has gone away
    /// - [`ScanError::ListNamespaces`] if namespaces cannot be listed
    pub async fn scan_once(&self) -> Result<ScanReport, ScanError> {
        if self.shutdown.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let namespaces = tokio::select! {
            () = self.shutdown.cancelled() => return Err(ScanError::Cancelled),
            listed = self.store.list_namespaces() => listed.map_err(ScanError::ListNamespaces)?,
        };

        let mut report = ScanReport::default();

        for namespace in namespaces {
            report.namespaces += 1;

            let listed = tokio::select! {
                () = self.shutdown.cancelled() => return Err(ScanError::Cancelled),
                listed = self.store.list_ssls(&namespace) => listed,
            };
            let ssls = match listed {
                Ok(ssls) => ssls,
                Err(err) => {
                    warn!(namespace = %namespace, error = %err, "Failed to list SSL resources, skipping namespace");
                    report.failed_namespaces.push(namespace);
                    continue;
                }
            };

            for ssl in &ssls {
                self.send(ObjectRef::from_obj(ssl)).await?;
                report.emitted += 1;
            }

            debug!(namespace = %namespace, count = ssls.len(), "Scanned namespace");
        }

        Ok(report)
    }

    async fn send(&self, request: ObjectRef<SSL>) -> Result<(), ScanError> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(ScanError::Cancelled),
            sent = self.requests.send(request) => {
                sent.map_err(|_| ScanError::ChannelClosed)?;
                metrics::record_triggers(metrics::SOURCE_SCAN, 1);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod scanner_tests;
