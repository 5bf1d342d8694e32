// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Secret update trigger source.
//!
//! Secrets are watched metadata-only. [`SecretUpdateFilter`] keeps the last seen
//! `resourceVersion` per secret and reports only real updates: the first sighting of
//! a secret (a create, or the initial list) and deletions produce nothing. A missing
//! secret is reported by the reconciler's own read on the next trigger.
//!
//! Updated secrets are mapped to `SSL` requests through the controller's reflector
//! store with [`ssls_referencing_secret`].

use crate::crd::SSL;
use crate::metrics;
use futures::stream::{self, Stream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher::{self, Event};
use kube::runtime::{metadata_watcher, WatchStreamExt};
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Identity of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl SecretRef {
    fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

/// Turns a secret watch stream into update notifications.
#[derive(Debug, Default)]
pub struct SecretUpdateFilter {
    versions: HashMap<SecretRef, String>,
    relisted: HashSet<SecretRef>,
}

impl SecretUpdateFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one watch event; returns the secret when the event is an update.
    ///
    /// During a relist (`Init`, `InitApply`, `InitDone`) a secret whose version moved
    /// while the watch was disconnected counts as updated, and secrets that were not
    /// relisted are forgotten.
    pub fn observe<K: Resource>(&mut self, event: &Event<K>) -> Option<SecretRef> {
        match event {
            Event::Apply(obj) => self.record(obj),
            Event::InitApply(obj) => {
                self.relisted.insert(SecretRef::of(obj));
                self.record(obj)
            }
            Event::Delete(obj) => {
                self.versions.remove(&SecretRef::of(obj));
                None
            }
            Event::Init => {
                self.relisted.clear();
                None
            }
            Event::InitDone => {
                let relisted = std::mem::take(&mut self.relisted);
                self.versions.retain(|secret, _| relisted.contains(secret));
                None
            }
        }
    }

    fn record<K: Resource>(&mut self, obj: &K) -> Option<SecretRef> {
        let secret = SecretRef::of(obj);
        let version = obj.resource_version().unwrap_or_default();
        match self.versions.insert(secret.clone(), version.clone()) {
            Some(previous) if previous != version => Some(secret),
            _ => None,
        }
    }

    /// Number of secrets currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Find every `SSL` in `namespace` whose `spec.secretReference` is `secret`.
///
/// `SSL` resources in other namespaces never match, even with the same reference.
#[must_use]
pub fn ssls_referencing_secret(
    ssls: &Store<SSL>,
    namespace: &str,
    secret: &str,
) -> Vec<ObjectRef<SSL>> {
    ssls.state()
        .iter()
        .filter(|ssl| {
            ssl.namespace().as_deref() == Some(namespace) && ssl.spec.secret_reference == secret
        })
        .map(|ssl| ObjectRef::from_obj(ssl.as_ref()))
        .collect()
}

/// Reconcile requests for every `SSL` whose secret was updated.
///
/// Watches secrets cluster-wide; watch errors are logged and the watch resumes with
/// backoff.
pub fn secret_update_triggers(
    client: Client,
    ssls: Store<SSL>,
) -> impl Stream<Item = ObjectRef<SSL>> + Send + 'static {
    let secrets: Api<Secret> = Api::all(client);
    let mut filter = SecretUpdateFilter::new();

    metadata_watcher(secrets, watcher::Config::default())
        .default_backoff()
        .map(move |event| {
            let requests = match event {
                Ok(event) => filter
                    .observe(&event)
                    .map(|secret| {
                        let requests =
                            ssls_referencing_secret(&ssls, &secret.namespace, &secret.name);
                        debug!(
                            namespace = %secret.namespace,
                            secret = %secret.name,
                            ssls = requests.len(),
                            "Secret updated"
                        );
                        metrics::record_triggers(metrics::SOURCE_SECRET, requests.len());
                        requests
                    })
                    .unwrap_or_default(),
                Err(err) => {
                    warn!(error = %err, "Secret watch failed, retrying with backoff");
                    Vec::new()
                }
            };
            stream::iter(requests)
        })
        .flatten()
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod secrets_tests;
