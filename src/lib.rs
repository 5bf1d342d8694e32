// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Certwatch - TLS Certificate Expiry Operator for Kubernetes
//!
//! Certwatch keeps a `Ready` condition on `SSL` custom resources in sync with the
//! expiry of the certificate stored in a referenced `kubernetes.io/tls` secret.
//!
//! ## Overview
//!
//! An `SSL` resource names a secret and a lookahead window `limitBeforeDays`. The
//! controller reports `Ready=True` while the certificate will still be valid that many
//! days from now, `Ready=False` once it will not, and `Ready=Unknown` with a reason
//! when the secret cannot be evaluated.
//!
//! Reconciliation is triggered by changes to `SSL` resources, by updates to the
//! secrets they reference, and by a periodic scan that catches certificates crossing
//! their horizon without any object changing.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition for `SSL`
//! - [`certificate`] - PEM/X.509 inspection and readiness evaluation
//! - [`reconcilers`] - Reconciliation logic and status condition helpers
//! - [`triggers`] - Secret update and periodic scan request sources
//! - [`controller`] - Controller wiring
//! - [`store`] - Object store seam over the Kubernetes API
//! - [`context`] - Shared context for reconciliations
//! - [`config`] - Environment-driven operator configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use certwatch::crd::{SSLSpec, SSL};
//!
//! let ssl = SSL::new(
//!     "site",
//!     SSLSpec {
//!         secret_reference: "site-tls".to_string(),
//!         limit_before_days: 30,
//!     },
//! );
//! ```

pub mod certificate;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod store;
pub mod triggers;

#[cfg(test)]
mod test_support;
