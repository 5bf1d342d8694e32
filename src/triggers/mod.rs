// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Synthetic reconcile request sources for the `SSL` controller.
//!
//! Besides its own watch on `SSL` resources, the controller receives requests from:
//!
//! - [`secrets`] - updates to a secret are mapped to every `SSL` in the same namespace
//!   that references it
//! - [`scanner`] - a periodic scan re-triggers every `SSL` so expiry is noticed even
//!   when no object changes

pub mod scanner;
pub mod secrets;

pub use scanner::{ExpiryScanner, ScanError, ScanReport};
pub use secrets::{secret_update_triggers, ssls_referencing_secret, SecretRef, SecretUpdateFilter};
