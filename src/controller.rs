// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `SSL` controller wiring.
//!
//! One [`kube::runtime::Controller`] merges three request sources into a single
//! deduplicating queue:
//!
//! - its own cluster-wide watch on `SSL` resources
//! - secret updates, mapped through the controller's `SSL` reflector store
//! - the periodic expiry scanner's channel
//!
//! Reconciliation itself lives in [`crate::reconcilers::ssl`].

use crate::config::OperatorConfig;
use crate::constants::PERMANENT_ERROR_REQUEUE_DURATION_SECS;
use crate::context::Context;
use crate::crd::SSL;
use crate::reconcilers::{reconcile_ssl, ReconcileError, ReconcileOutcome};
use crate::triggers::secret_update_triggers;
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run the `SSL` controller until `shutdown` fires.
///
/// `scan_requests` is the receiving end of the expiry scanner's channel. In-flight
/// reconciliations finish before this returns.
pub async fn run_ssl_controller(
    client: Client,
    ctx: Arc<Context>,
    scan_requests: mpsc::Receiver<ObjectRef<SSL>>,
    shutdown: CancellationToken,
) {
    info!(
        concurrency = ctx.config.reconcile_concurrency,
        "Starting SSL controller"
    );

    let api = Api::<SSL>::all(client.clone());
    let controller = Controller::new(api, WatcherConfig::default());
    let ssls = controller.store();
    let config = controller::Config::default().concurrency(ctx.config.reconcile_concurrency);

    controller
        .with_config(config)
        .reconcile_on(secret_update_triggers(client, ssls))
        .reconcile_on(ReceiverStream::new(scan_requests))
        .graceful_shutdown_on(async move { shutdown.cancelled().await })
        .run(reconcile_ssl_wrapper, error_policy, ctx)
        .for_each(|result| {
            match result {
                Ok((object, _)) => debug!(
                    namespace = object.namespace.as_deref().unwrap_or_default(),
                    name = %object.name,
                    "Reconciled SSL"
                ),
                Err(controller::Error::ObjectNotFound(object)) => debug!(
                    namespace = object.namespace.as_deref().unwrap_or_default(),
                    name = %object.name,
                    "Skipping request for SSL that no longer exists"
                ),
                Err(err) => warn!(error = %err, "SSL controller error"),
            }
            futures::future::ready(())
        })
        .await;

    info!("SSL controller stopped");
}

/// Reconcile wrapper for `SSL`.
///
/// Only the object's identity is used; [`reconcile_ssl`] re-reads the current state.
async fn reconcile_ssl_wrapper(ssl: Arc<SSL>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = ssl.namespace().unwrap_or_default();
    let name = ssl.name_any();

    let outcome = reconcile_ssl(&ctx, &namespace, &name).await?;
    Ok(action_for(&outcome))
}

/// Requeue when the verdict will change on its own, otherwise wait for a trigger.
fn action_for(outcome: &ReconcileOutcome) -> Action {
    outcome
        .requeue_after
        .map_or_else(Action::await_change, Action::requeue)
}

/// Error policy for the `SSL` controller.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(ssl: Arc<SSL>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let delay = error_requeue(err, &ctx.config);
    if err.is_retryable() {
        warn!(
            namespace = %ssl.namespace().unwrap_or_default(),
            name = %ssl.name_any(),
            error = %err,
            "Transient reconciliation error - will retry in {}s",
            delay.as_secs()
        );
    } else {
        error!(
            namespace = %ssl.namespace().unwrap_or_default(),
            name = %ssl.name_any(),
            error = %err,
            "Reconciliation error - will retry in {}s",
            delay.as_secs()
        );
    }
    Action::requeue(delay)
}

/// Requeue delay for a failed reconciliation.
///
/// Transient failures use the configured error requeue. Permanent ones back off to
/// at least [`PERMANENT_ERROR_REQUEUE_DURATION_SECS`].
fn error_requeue(err: &ReconcileError, config: &OperatorConfig) -> Duration {
    if err.is_retryable() {
        config.error_requeue
    } else {
        config
            .error_requeue
            .max(Duration::from_secs(PERMANENT_ERROR_REQUEUE_DURATION_SECS))
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
