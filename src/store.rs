// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store access for `SSL` resources and their secrets.
//!
//! The reconciler and the periodic scanner only talk to the cluster through the
//! [`ObjectStore`] trait. [`KubeStore`] is the production implementation backed by
//! the Kubernetes API; tests use an in-memory implementation.
//!
//! Status writes carry the `resourceVersion` the caller read, so a write based on a
//! stale read fails with [`StoreError::Conflict`] instead of clobbering a newer object.

use crate::crd::SSL;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Errors returned by [`ObjectStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read (HTTP 409).
    #[error("conflict writing {namespace}/{name}: object was modified")]
    Conflict { namespace: String, name: String },

    /// Any other Kubernetes API failure.
    #[error("kubernetes API error: {0}")]
    Api(#[source] kube::Error),

    /// The object could not be serialized for the request.
    #[error("failed to serialize object: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the failure is transient and worth retrying through the error policy.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Api(e) => crate::reconcilers::retry::is_retryable_error(e),
            Self::Serialize(_) => false,
        }
    }
}

/// Read and status-write access to the objects the controller needs.
///
/// `get_*` return `Ok(None)` when the object does not exist.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an `SSL` resource.
    async fn get_ssl(&self, namespace: &str, name: &str) -> Result<Option<SSL>, StoreError>;

    /// Fetch a secret.
    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, StoreError>;

    /// List the names of all namespaces in the cluster.
    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError>;

    /// List all `SSL` resources in one namespace.
    async fn list_ssls(&self, namespace: &str) -> Result<Vec<SSL>, StoreError>;

    /// Persist `ssl.status`, failing with [`StoreError::Conflict`] if the object
    /// moved past `ssl.metadata.resourceVersion`.
    async fn update_ssl_status(&self, ssl: &SSL) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify(err: kube::Error, namespace: &str, name: &str) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        other => StoreError::Api(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_ssl(&self, namespace: &str, name: &str) -> Result<Option<SSL>, StoreError> {
        let api: Api<SSL> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(StoreError::Api)
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(StoreError::Api)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api
            .list(&ListParams::default())
            .await
            .map_err(StoreError::Api)?;
        Ok(namespaces.items.iter().map(ResourceExt::name_any).collect())
    }

    async fn list_ssls(&self, namespace: &str) -> Result<Vec<SSL>, StoreError> {
        let api: Api<SSL> = Api::namespaced(self.client.clone(), namespace);
        let ssls = api
            .list(&ListParams::default())
            .await
            .map_err(StoreError::Api)?;
        Ok(ssls.items)
    }

    async fn update_ssl_status(&self, ssl: &SSL) -> Result<(), StoreError> {
        let namespace = ssl.namespace().unwrap_or_default();
        let name = ssl.name_any();
        let api: Api<SSL> = Api::namespaced(self.client.clone(), &namespace);

        // A merge patch carrying resourceVersion is rejected with 409 when stale.
        let patch = json!({
            "metadata": { "resourceVersion": ssl.resource_version() },
            "status": serde_json::to_value(&ssl.status)?,
        });

        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &namespace, &name))?;

        debug!(namespace = %namespace, name = %name, "Patched SSL status");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
