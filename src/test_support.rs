// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests: generated certificates, resource builders and an
//! in-memory [`ObjectStore`].

use crate::constants::{SECRET_TYPE_TLS, TLS_PRIVATE_KEY_KEY};
use crate::crd::{SSLSpec, SSL};
use crate::store::{ObjectStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Self-signed PEM certificate valid from `now + not_before_days` to
/// `now + not_after_days`.
pub(crate) fn certificate_pem(not_before_days: i64, not_after_days: i64) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let day = 86_400;

    let mut params = rcgen::CertificateParams::new(vec!["certwatch.test".to_string()]).unwrap();
    params.not_before =
        time::OffsetDateTime::from_unix_timestamp(now + not_before_days * day).unwrap();
    params.not_after =
        time::OffsetDateTime::from_unix_timestamp(now + not_after_days * day).unwrap();

    let key = rcgen::KeyPair::generate().unwrap();
    params.self_signed(&key).unwrap().pem()
}

pub(crate) fn ssl(namespace: &str, name: &str, secret: &str, limit_before_days: u32) -> SSL {
    let mut ssl = SSL::new(
        name,
        SSLSpec {
            secret_reference: secret.to_string(),
            limit_before_days,
        },
    );
    ssl.metadata.namespace = Some(namespace.to_string());
    ssl
}

pub(crate) fn secret(
    namespace: &str,
    name: &str,
    type_: &str,
    data: BTreeMap<String, ByteString>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some(type_.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// `kubernetes.io/tls` secret whose `tls.key` holds `contents`.
pub(crate) fn tls_secret(namespace: &str, name: &str, contents: &str) -> Secret {
    let data = BTreeMap::from([(
        TLS_PRIVATE_KEY_KEY.to_string(),
        ByteString(contents.as_bytes().to_vec()),
    )]);
    secret(namespace, name, SECRET_TYPE_TLS, data)
}

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct Inner {
    namespaces: BTreeSet<String>,
    ssls: BTreeMap<Key, SSL>,
    secrets: BTreeMap<Key, Secret>,
    next_version: u64,
    conflicts_remaining: u32,
    failing_namespaces: BTreeSet<String>,
    fail_namespace_list: bool,
    fail_ssl_reads: bool,
    fail_secret_reads: bool,
    status_writes: usize,
    namespace_lists: usize,
}

impl Inner {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// In-memory [`ObjectStore`] that enforces `resourceVersion` on status writes.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_namespace(&self, namespace: &str) {
        self.inner
            .lock()
            .unwrap()
            .namespaces
            .insert(namespace.to_string());
    }

    pub(crate) fn insert_ssl(&self, mut ssl: SSL) {
        let mut inner = self.inner.lock().unwrap();
        let namespace = ssl.namespace().unwrap_or_default();
        ssl.metadata.resource_version = Some(inner.bump());
        inner.namespaces.insert(namespace.clone());
        inner.ssls.insert(key(&namespace, &ssl.name_any()), ssl);
    }

    pub(crate) fn insert_secret(&self, secret: Secret) {
        let mut inner = self.inner.lock().unwrap();
        let namespace = secret.namespace().unwrap_or_default();
        inner.namespaces.insert(namespace.clone());
        inner.secrets.insert(key(&namespace, &secret.name_any()), secret);
    }

    pub(crate) fn remove_secret(&self, namespace: &str, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .secrets
            .remove(&key(namespace, name));
    }

    pub(crate) fn stored_ssl(&self, namespace: &str, name: &str) -> Option<SSL> {
        self.inner
            .lock()
            .unwrap()
            .ssls
            .get(&key(namespace, name))
            .cloned()
    }

    /// Reject the next `count` status writes with a conflict, as if another writer
    /// updated the object first.
    pub(crate) fn conflict_next_writes(&self, count: u32) {
        self.inner.lock().unwrap().conflicts_remaining = count;
    }

    pub(crate) fn fail_list_in(&self, namespace: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_namespaces
            .insert(namespace.to_string());
    }

    pub(crate) fn fail_namespace_list(&self, fail: bool) {
        self.inner.lock().unwrap().fail_namespace_list = fail;
    }

    pub(crate) fn fail_ssl_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_ssl_reads = fail;
    }

    pub(crate) fn fail_secret_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_secret_reads = fail;
    }

    pub(crate) fn status_writes(&self) -> usize {
        self.inner.lock().unwrap().status_writes
    }

    pub(crate) fn namespace_lists(&self) -> usize {
        self.inner.lock().unwrap().namespace_lists
    }
}

pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(
        kube::core::Status::failure(&format!("{reason} from test"), reason)
            .with_code(code)
            .boxed(),
    )
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_ssl(&self, namespace: &str, name: &str) -> Result<Option<SSL>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_ssl_reads {
            return Err(StoreError::Api(api_error(503, "ServiceUnavailable")));
        }
        Ok(inner.ssls.get(&key(namespace, name)).cloned())
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_secret_reads {
            return Err(StoreError::Api(api_error(503, "ServiceUnavailable")));
        }
        Ok(inner.secrets.get(&key(namespace, name)).cloned())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.namespace_lists += 1;
        if inner.fail_namespace_list {
            return Err(StoreError::Api(api_error(500, "InternalError")));
        }
        Ok(inner.namespaces.iter().cloned().collect())
    }

    async fn list_ssls(&self, namespace: &str) -> Result<Vec<SSL>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_namespaces.contains(namespace) {
            return Err(StoreError::Api(api_error(403, "Forbidden")));
        }
        Ok(inner
            .ssls
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, ssl)| ssl.clone())
            .collect())
    }

    async fn update_ssl_status(&self, ssl: &SSL) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let namespace = ssl.namespace().unwrap_or_default();
        let name = ssl.name_any();
        let k = key(&namespace, &name);
        let conflict = StoreError::Conflict {
            namespace: namespace.clone(),
            name: name.clone(),
        };

        if inner.conflicts_remaining > 0 {
            inner.conflicts_remaining -= 1;
            let version = inner.bump();
            if let Some(stored) = inner.ssls.get_mut(&k) {
                stored.metadata.resource_version = Some(version);
            }
            return Err(conflict);
        }

        let Some(stored_version) = inner
            .ssls
            .get(&k)
            .map(|stored| stored.metadata.resource_version.clone())
        else {
            return Err(StoreError::Api(api_error(404, "NotFound")));
        };
        if stored_version != ssl.metadata.resource_version {
            return Err(conflict);
        }

        let version = inner.bump();
        let mut updated = ssl.clone();
        updated.metadata.resource_version = Some(version);
        inner.ssls.insert(k, updated);
        inner.status_writes += 1;
        Ok(())
    }
}
