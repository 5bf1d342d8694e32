// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for `SSL` resources.
//!
//! # Reconciliation Architecture
//!
//! Reconciliation is level-triggered:
//!
//! 1. **Fetch** - Re-read the `SSL` resource and the secret it references
//! 2. **Evaluate** - Parse the certificate and test it at `now + limitBeforeDays`
//! 3. **Status** - Merge the resulting `Ready` condition and write it if it changed
//!
//! # Modules
//!
//! - [`ssl`] - The `SSL` reconciler and its [`Verdict`] state machine
//! - [`status`] - Condition construction and merge helpers
//! - [`retry`] - Backoff for status write conflicts and transient error classification
//!
//! # Example: Using the Reconciler
//!
//! ```rust,no_run
//! use certwatch::context::Context;
//! use certwatch::reconcilers::reconcile_ssl;
//!
//! async fn reconcile(ctx: &Context) -> anyhow::Result<()> {
//!     let outcome = reconcile_ssl(ctx, "web", "site").await?;
//!     println!("requeue after {:?}", outcome.requeue_after);
//!     Ok(())
//! }
//! ```

pub mod retry;
pub mod ssl;
pub mod status;

pub use ssl::{assess_secret, reconcile_ssl, ReconcileError, ReconcileOutcome, Verdict};
