// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `CERTWATCH_SCAN_INTERVAL_SECS` | 86400 |
//! | `CERTWATCH_SCAN_QUEUE_CAPACITY` | 64 |
//! | `CERTWATCH_RECONCILE_CONCURRENCY` | 4 (0 = unbounded) |
//! | `CERTWATCH_ERROR_REQUEUE_SECS` | 30 |
//! | `CERTWATCH_CONFLICT_RETRIES` | 5 |
//!
//! Unset or empty variables fall back to the default. Malformed values are an error
//! rather than a silent fallback. Durations are capped at 365 days.

use crate::constants::{
    DEFAULT_CONFLICT_RETRIES, DEFAULT_RECONCILE_CONCURRENCY, DEFAULT_SCAN_INTERVAL_SECS,
    DEFAULT_SCAN_QUEUE_CAPACITY, ERROR_REQUEUE_DURATION_SECS, MAX_CONFIGURED_DURATION_SECS,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_SCAN_INTERVAL_SECS: &str = "CERTWATCH_SCAN_INTERVAL_SECS";
pub const ENV_SCAN_QUEUE_CAPACITY: &str = "CERTWATCH_SCAN_QUEUE_CAPACITY";
pub const ENV_RECONCILE_CONCURRENCY: &str = "CERTWATCH_RECONCILE_CONCURRENCY";
pub const ENV_ERROR_REQUEUE_SECS: &str = "CERTWATCH_ERROR_REQUEUE_SECS";
pub const ENV_CONFLICT_RETRIES: &str = "CERTWATCH_CONFLICT_RETRIES";

/// Errors raised while loading [`OperatorConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{variable}={value:?} is not a valid {expected}")]
    Invalid {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{variable} must be greater than zero")]
    Zero { variable: &'static str },

    #[error("{variable}={value} exceeds the maximum of {max}")]
    TooLarge {
        variable: &'static str,
        value: u64,
        max: u64,
    },
}

/// Runtime tunables for the controller and the expiry scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Time between periodic expiry scans.
    pub scan_interval: Duration,
    /// Capacity of the bounded scanner-to-controller channel.
    pub scan_queue_capacity: usize,
    /// Maximum concurrent reconciliations; 0 means unbounded.
    pub reconcile_concurrency: u16,
    /// Requeue delay after a failed reconciliation.
    pub error_requeue: Duration,
    /// Status write attempts per reconciliation before giving up on conflicts.
    pub conflict_retries: u32,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            scan_queue_capacity: DEFAULT_SCAN_QUEUE_CAPACITY,
            reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
            error_requeue: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to a malformed or out-of-range value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to a malformed or out-of-range value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let scan_interval_secs = parse(
            &lookup,
            ENV_SCAN_INTERVAL_SECS,
            defaults.scan_interval.as_secs(),
        )?;
        let scan_queue_capacity = parse(
            &lookup,
            ENV_SCAN_QUEUE_CAPACITY,
            defaults.scan_queue_capacity,
        )?;
        let reconcile_concurrency = parse(
            &lookup,
            ENV_RECONCILE_CONCURRENCY,
            defaults.reconcile_concurrency,
        )?;
        let error_requeue_secs = parse(
            &lookup,
            ENV_ERROR_REQUEUE_SECS,
            defaults.error_requeue.as_secs(),
        )?;
        let conflict_retries = parse(&lookup, ENV_CONFLICT_RETRIES, defaults.conflict_retries)?;

        non_zero(ENV_SCAN_INTERVAL_SECS, scan_interval_secs)?;
        non_zero(ENV_SCAN_QUEUE_CAPACITY, u64::try_from(scan_queue_capacity).unwrap_or(u64::MAX))?;
        non_zero(ENV_CONFLICT_RETRIES, u64::from(conflict_retries))?;
        at_most(ENV_SCAN_INTERVAL_SECS, scan_interval_secs, MAX_CONFIGURED_DURATION_SECS)?;
        at_most(ENV_ERROR_REQUEUE_SECS, error_requeue_secs, MAX_CONFIGURED_DURATION_SECS)?;

        Ok(Self {
            scan_interval: Duration::from_secs(scan_interval_secs),
            scan_queue_capacity,
            reconcile_concurrency,
            error_requeue: Duration::from_secs(error_requeue_secs),
            conflict_retries,
        })
    }
}

fn parse<F, T>(lookup: &F, variable: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(variable) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                variable,
                value,
                expected: "non-negative integer",
            })
        }
        _ => Ok(default),
    }
}

fn non_zero(variable: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { variable });
    }
    Ok(())
}

fn at_most(variable: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::TooLarge {
            variable,
            value,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
