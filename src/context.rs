// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context passed to every reconciliation.

use crate::config::OperatorConfig;
use crate::store::ObjectStore;
use std::sync::Arc;

/// Shared context for the `SSL` controller.
///
/// Holds the object store the reconciler reads and writes through, and the
/// operator configuration.
#[derive(Clone)]
pub struct Context {
    /// Object store for `SSL` resources and secrets
    pub store: Arc<dyn ObjectStore>,

    /// Operator configuration
    pub config: OperatorConfig,
}

impl Context {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: OperatorConfig) -> Self {
        Self { store, config }
    }
}
