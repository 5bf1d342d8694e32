// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for certificate expiry tracking.
//!
//! # Resource Types
//!
//! - [`SSL`] - Names a TLS secret and a lookahead window; reports whether the
//!   certificate stored in the secret is still valid at the end of that window.
//!
//! # Example: Creating an SSL resource
//!
//! ```rust,no_run
//! use certwatch::crd::SSLSpec;
//!
//! let spec = SSLSpec {
//!     secret_reference: "site-tls".to_string(),
//!     limit_before_days: 30,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a condition: True, False, or Unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// The string form used in the Kubernetes API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents an observation of a resource's current state.
///
/// At most one condition of each `type` exists in a status; see
/// [`crate::reconcilers::status::upsert_condition`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The controller writes `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: ConditionStatus,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `SSL` watches a TLS secret and reports whether its certificate will still be
/// valid `limitBeforeDays` days from now.
///
/// # Example
///
/// ```yaml
/// apiVersion: certwatch.io/v1beta1
/// kind: SSL
/// metadata:
///   name: site
///   namespace: web
/// spec:
///   secretReference: site-tls
///   limitBeforeDays: 30
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "certwatch.io",
    version = "v1beta1",
    kind = "SSL",
    plural = "ssls",
    namespaced,
    doc = "SSL tracks the expiry of the certificate held in a TLS secret in the same namespace. The Ready condition turns False once the certificate is no longer valid limitBeforeDays days ahead.",
    printcolumn = r#"{"name":"Secret","type":"string","jsonPath":".spec.secretReference"}"#,
    printcolumn = r#"{"name":"LimitBeforeDays","type":"integer","jsonPath":".spec.limitBeforeDays"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[kube(status = "SSLStatus")]
#[serde(rename_all = "camelCase")]
pub struct SSLSpec {
    /// Name of a `kubernetes.io/tls` secret in the same namespace.
    ///
    /// Cross-namespace references are not supported.
    pub secret_reference: String,

    /// Number of days before the certificate's `notAfter` at which `Ready` turns `False`.
    #[schemars(range(min = 1))]
    pub limit_before_days: u32,
}

/// `SSL` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
pub struct SSLStatus {
    /// Known condition types: `Ready`.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
