// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `SSL` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. Only the `Unknown` states of the `Ready` condition carry a
//! reason: they describe a secret that could not be evaluated. The expiry verdict
//! itself (`True`/`False`) is reported with the status alone.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "Unknown"
//!       reason: SecretTypeIsInvalid
//!       message: 'web/site-tls secret type is "Opaque"'
//!       lastTransitionTime: "2025-11-29T23:45:00Z"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Primary condition type indicating whether the certificate is valid at the horizon.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Secret Validation Reasons
// ============================================================================

/// The secret named by `spec.secretReference` does not exist in the resource's namespace.
///
/// Restoring the secret is picked up by the next reconciliation.
pub const REASON_SECRET_IS_NOT_FOUND: &str = "SecretIsNotFound";

/// The referenced secret exists but is not a `kubernetes.io/tls` secret.
///
/// The message carries the observed secret type.
pub const REASON_SECRET_TYPE_IS_INVALID: &str = "SecretTypeIsInvalid";

/// The referenced TLS secret has no `tls.key` entry.
pub const REASON_TLS_KEY_NOT_FOUND: &str = "TLSKeyNotFound";

/// The `tls.key` entry is not a PEM-encoded X.509 certificate.
///
/// The message carries the decoder or parser error.
pub const REASON_TLS_KEY_CAN_NOT_PARSE: &str = "TLSKeyCanNotParse";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
