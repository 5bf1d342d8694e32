// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the certwatch operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the certwatch CRDs
pub const API_GROUP: &str = "certwatch.io";

/// API version for the certwatch CRDs
pub const API_VERSION: &str = "v1beta1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "certwatch.io/v1beta1";

/// Kind name for the `SSL` resource
pub const KIND_SSL: &str = "SSL";

// ============================================================================
// Secret Contract
// ============================================================================

/// Secret type that marks a Kubernetes TLS secret
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// Key under which a TLS secret carries its private key material
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

// ============================================================================
// Time Constants
// ============================================================================

/// Seconds in one day
pub const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// Controller Defaults
// ============================================================================

/// Default interval between periodic expiry scans (24 hours)
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 86_400;

/// Default capacity of the bounded channel between the scanner and the controller
pub const DEFAULT_SCAN_QUEUE_CAPACITY: usize = 64;

/// Default number of reconciliations allowed to run concurrently
pub const DEFAULT_RECONCILE_CONCURRENCY: u16 = 4;

/// Requeue delay after a failed reconciliation (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue delay after a failure that retrying soon will not fix, e.g. 403 (5 minutes)
pub const PERMANENT_ERROR_REQUEUE_DURATION_SECS: u64 = 300;

/// Upper bound accepted for any configured duration (365 days)
pub const MAX_CONFIGURED_DURATION_SECS: u64 = 365 * 86_400;

/// Default number of status write attempts per reconciliation
pub const DEFAULT_CONFLICT_RETRIES: u32 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of Tokio worker threads for the controller runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name prefix for the Tokio runtime
pub const TOKIO_THREAD_NAME: &str = "certwatch-controller";
