// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `SSL` reconciliation logic.
//!
//! Each run re-reads the `SSL` resource and its secret, derives a fresh [`Verdict`]
//! for the `Ready` condition and merges it into the status. Nothing from a previous
//! run is consulted, so the same inputs always produce the same condition.
//!
//! Only infrastructure failures surface as [`ReconcileError`]. A missing secret, a
//! wrong secret type or unreadable key material are reported through the condition
//! and count as a successful reconciliation.

use crate::certificate::{
    evaluate, horizon, inspect_certificate, next_transition, InspectError, Readiness,
    ValidityWindow,
};
use crate::constants::{SECRET_TYPE_TLS, TLS_PRIVATE_KEY_KEY};
use crate::context::Context;
use crate::crd::{Condition, ConditionStatus, SSLStatus};
use crate::metrics;
use crate::reconcilers::retry::conflict_backoff;
use crate::reconcilers::status::{conditions_equal, create_condition, upsert_condition};
use crate::status_reasons::{
    CONDITION_TYPE_READY, REASON_SECRET_IS_NOT_FOUND, REASON_SECRET_TYPE_IS_INVALID,
    REASON_TLS_KEY_CAN_NOT_PARSE, REASON_TLS_KEY_NOT_FOUND,
};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Infrastructure failures that abort a reconciliation and requeue it.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to get SSL {namespace}/{name}: {source}")]
    GetSsl {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to get secret {namespace}/{secret}: {source}")]
    GetSecret {
        namespace: String,
        secret: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to update status of SSL {namespace}/{name}: {source}")]
    UpdateStatus {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("status of SSL {namespace}/{name} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        namespace: String,
        name: String,
        attempts: u32,
    },
}

impl ReconcileError {
    /// Whether an early requeue is likely to succeed.
    ///
    /// Throttling, server errors, network failures and conflicts are transient.
    /// Client errors such as 403 need an operator to step in first.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GetSsl { source, .. }
            | Self::GetSecret { source, .. }
            | Self::UpdateStatus { source, .. } => source.is_retryable(),
            Self::ConflictRetriesExhausted { .. } => true,
        }
    }
}

/// The computed state of the `Ready` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The referenced secret does not exist.
    SecretNotFound,
    /// The secret is not a `kubernetes.io/tls` secret.
    SecretTypeInvalid { secret_type: String },
    /// The secret has no `tls.key` entry.
    KeyNotFound,
    /// The `tls.key` entry holds no readable certificate.
    KeyParseError(InspectError),
    /// The certificate is not valid at the horizon.
    NotReady(ValidityWindow),
    /// The certificate is valid at the horizon.
    Ready(ValidityWindow),
}

impl Verdict {
    #[must_use]
    pub fn status(&self) -> ConditionStatus {
        match self {
            Self::Ready(_) => ConditionStatus::True,
            Self::NotReady(_) => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }

    /// CamelCase reason, set only for the `Unknown` states.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::SecretNotFound => Some(REASON_SECRET_IS_NOT_FOUND),
            Self::SecretTypeInvalid { .. } => Some(REASON_SECRET_TYPE_IS_INVALID),
            Self::KeyNotFound => Some(REASON_TLS_KEY_NOT_FOUND),
            Self::KeyParseError(_) => Some(REASON_TLS_KEY_CAN_NOT_PARSE),
            Self::NotReady(_) | Self::Ready(_) => None,
        }
    }

    /// Human-readable message naming the secret `namespace/secret`.
    #[must_use]
    pub fn message(&self, namespace: &str, secret: &str) -> Option<String> {
        match self {
            Self::SecretNotFound => Some(format!("{namespace}/{secret} secret is not found")),
            Self::SecretTypeInvalid { secret_type } => Some(format!(
                "{namespace}/{secret} secret type is {secret_type:?}"
            )),
            Self::KeyNotFound => Some(format!(
                "{namespace}/{secret} secret doesn't have tls key"
            )),
            Self::KeyParseError(err) => Some(format!(
                "{namespace}/{secret} secret tls key can not parse: {err}"
            )),
            Self::NotReady(_) | Self::Ready(_) => None,
        }
    }

    /// Render the verdict as a `Ready` condition stamped with the current time.
    #[must_use]
    pub fn to_condition(&self, namespace: &str, secret: &str) -> Condition {
        create_condition(
            CONDITION_TYPE_READY,
            self.status(),
            self.reason(),
            self.message(namespace, secret).as_deref(),
        )
    }

    /// Time until the verdict can change without any object changing.
    fn next_transition(&self, horizon: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::Ready(window) | Self::NotReady(window) => next_transition(window, horizon),
            _ => None,
        }
    }

    fn metric_outcome(&self) -> &'static str {
        match self {
            Self::Ready(_) => metrics::OUTCOME_READY,
            Self::NotReady(_) => metrics::OUTCOME_NOT_READY,
            _ => metrics::OUTCOME_UNKNOWN,
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// `None` when the `SSL` no longer exists.
    pub verdict: Option<Verdict>,
    /// When to reconcile again without a trigger, if the verdict will change on its own.
    pub requeue_after: Option<Duration>,
    /// Whether a status write happened.
    pub status_written: bool,
}

impl ReconcileOutcome {
    fn deleted() -> Self {
        Self {
            verdict: None,
            requeue_after: None,
            status_written: false,
        }
    }

    fn metric_outcome(&self) -> &'static str {
        self.verdict
            .as_ref()
            .map_or(metrics::OUTCOME_DELETED, Verdict::metric_outcome)
    }
}

/// Read the certificate bytes from `tls.key`, preferring `data` over `stringData`.
fn tls_key_bytes(secret: &Secret) -> Option<&[u8]> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(TLS_PRIVATE_KEY_KEY))
        .map(|bytes| bytes.0.as_slice())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(TLS_PRIVATE_KEY_KEY))
                .map(String::as_bytes)
        })
}

/// Derive the verdict for `secret` at `horizon`.
///
/// Checks run in order and the first failing one decides: existence, secret type,
/// presence of `tls.key`, certificate parsing, then validity at the horizon.
#[must_use]
pub fn assess_secret(secret: Option<&Secret>, horizon: DateTime<Utc>) -> Verdict {
    let Some(secret) = secret else {
        return Verdict::SecretNotFound;
    };

    let secret_type = secret.type_.as_deref().unwrap_or_default();
    if secret_type != SECRET_TYPE_TLS {
        return Verdict::SecretTypeInvalid {
            secret_type: secret_type.to_string(),
        };
    }

    let Some(key) = tls_key_bytes(secret) else {
        return Verdict::KeyNotFound;
    };

    match inspect_certificate(key) {
        Ok(window) => match evaluate(&window, horizon) {
            Readiness::Ready => Verdict::Ready(window),
            Readiness::NotReady => Verdict::NotReady(window),
        },
        Err(err) => Verdict::KeyParseError(err),
    }
}

/// Reconcile the `SSL` resource `namespace/name`.
///
/// Fetches the current object, computes its `Ready` condition and writes the status
/// when it changed. A status write rejected as stale is retried from a fresh read,
/// up to `conflict_retries` attempts.
///
/// # Errors
///
/// Returns [`ReconcileError`] when the object store fails or status writes keep
/// conflicting. A deleted `SSL` is not an error.
pub async fn reconcile_ssl(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let start = Instant::now();
    let result = reconcile_with_retries(ctx, namespace, name).await;

    let outcome = result
        .as_ref()
        .map_or(metrics::OUTCOME_ERROR, ReconcileOutcome::metric_outcome);
    metrics::record_reconciliation(outcome, start.elapsed());

    result
}

async fn reconcile_with_retries(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let attempts = ctx.config.conflict_retries.max(1);
    let mut backoff = conflict_backoff();

    for attempt in 1..=attempts {
        match reconcile_once(ctx, namespace, name).await {
            Err(ReconcileError::UpdateStatus {
                source: StoreError::Conflict { .. },
                ..
            }) => {
                metrics::record_status_conflict();
                if attempt == attempts {
                    break;
                }
                let Some(delay) = backoff.next_backoff() else {
                    break;
                };
                warn!(
                    namespace = %namespace,
                    name = %name,
                    attempt,
                    delay = ?delay,
                    "SSL status changed during reconciliation, retrying from a fresh read"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }

    Err(ReconcileError::ConflictRetriesExhausted {
        namespace: namespace.to_string(),
        name: name.to_string(),
        attempts,
    })
}

async fn reconcile_once(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let Some(mut ssl) =
        ctx.store
            .get_ssl(namespace, name)
            .await
            .map_err(|source| ReconcileError::GetSsl {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?
    else {
        debug!(namespace = %namespace, name = %name, "SSL no longer exists, nothing to do");
        return Ok(ReconcileOutcome::deleted());
    };

    let target = horizon(Utc::now(), ssl.spec.limit_before_days);
    let secret_name = ssl.spec.secret_reference.clone();

    let secret = ctx
        .store
        .get_secret(namespace, &secret_name)
        .await
        .map_err(|source| ReconcileError::GetSecret {
            namespace: namespace.to_string(),
            secret: secret_name.clone(),
            source,
        })?;

    let verdict = assess_secret(secret.as_ref(), target);
    let requeue_after = verdict
        .next_transition(target)
        .map(|delay| delay.min(ctx.config.scan_interval));

    debug!(
        namespace = %namespace,
        name = %name,
        secret = %secret_name,
        horizon = %target,
        status = %verdict.status(),
        reason = verdict.reason().unwrap_or_default(),
        "Evaluated SSL"
    );

    let current = ssl
        .status
        .as_ref()
        .map(|status| status.conditions.clone())
        .unwrap_or_default();
    let mut conditions = current.clone();
    upsert_condition(&mut conditions, verdict.to_condition(namespace, &secret_name));

    if conditions_equal(&current, &conditions) {
        debug!(namespace = %namespace, name = %name, "SSL status unchanged, skipping update");
        return Ok(ReconcileOutcome {
            verdict: Some(verdict),
            requeue_after,
            status_written: false,
        });
    }

    ssl.status = Some(SSLStatus { conditions });
    ctx.store
        .update_ssl_status(&ssl)
        .await
        .map_err(|source| ReconcileError::UpdateStatus {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

    info!(
        namespace = %namespace,
        name = %name,
        secret = %secret_name,
        status = %verdict.status(),
        reason = verdict.reason().unwrap_or_default(),
        "Updated SSL Ready condition"
    );

    Ok(ReconcileOutcome {
        verdict: Some(verdict),
        requeue_after,
        status_written: true,
    })
}

#[cfg(test)]
#[path = "ssl_tests.rs"]
mod ssl_tests;
