// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate inspection and readiness evaluation.
//!
//! Both halves are pure functions:
//!
//! - [`inspect_certificate`] decodes a PEM envelope and parses the X.509 payload
//!   into a [`ValidityWindow`].
//! - [`evaluate`] decides whether that window still covers a target instant, the
//!   *horizon*, computed by [`horizon`] as `now + limitBeforeDays`.
//!
//! # Example
//!
//! ```rust,no_run
//! use certwatch::certificate::{evaluate, horizon, inspect_certificate, Readiness};
//! use chrono::Utc;
//!
//! # fn example(pem_bytes: &[u8]) -> Result<(), certwatch::certificate::InspectError> {
//! let window = inspect_certificate(pem_bytes)?;
//! let target = horizon(Utc::now(), 30);
//! if evaluate(&window, target) == Readiness::NotReady {
//!     println!("certificate expires within 30 days");
//! }
//! # Ok(())
//! # }
//! ```

use crate::constants::SECONDS_PER_DAY;
use crate::crd::ConditionStatus;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use thiserror::Error;
use x509_parser::{certificate::X509Certificate, prelude::FromDer};

/// Errors raised while reading a certificate out of PEM bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    /// No PEM block could be decoded from the input.
    #[error("failed to decode PEM block: {0}")]
    Decode(String),

    /// The PEM block does not contain a valid X.509 certificate.
    #[error("failed to parse certificate: {0}")]
    Parse(String),
}

/// The `[notBefore, notAfter]` validity period of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Readiness verdict for a certificate at a given horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The certificate is valid at the horizon.
    Ready,
    /// The certificate is not valid at the horizon.
    NotReady,
}

impl Readiness {
    /// The `Ready` condition status reporting this verdict.
    #[must_use]
    pub fn condition_status(self) -> ConditionStatus {
        match self {
            Self::Ready => ConditionStatus::True,
            Self::NotReady => ConditionStatus::False,
        }
    }
}

/// Parse the validity window out of PEM-encoded certificate bytes.
///
/// Only the first PEM block is considered.
///
/// # Errors
///
/// - [`InspectError::Decode`] if the input holds no PEM block
/// - [`InspectError::Parse`] if the block is not a DER-encoded X.509 certificate
pub fn inspect_certificate(pem_bytes: &[u8]) -> Result<ValidityWindow, InspectError> {
    let block = pem::parse(pem_bytes).map_err(|e| InspectError::Decode(e.to_string()))?;

    let (_, cert) = X509Certificate::from_der(block.contents())
        .map_err(|e| InspectError::Parse(e.to_string()))?;

    let validity = cert.validity();
    Ok(ValidityWindow {
        not_before: to_utc(validity.not_before.timestamp())?,
        not_after: to_utc(validity.not_after.timestamp())?,
    })
}

fn to_utc(timestamp: i64) -> Result<DateTime<Utc>, InspectError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| InspectError::Parse(format!("validity timestamp {timestamp} out of range")))
}

/// Compute the instant at which certificate validity is tested.
///
/// Saturates at the latest representable instant instead of overflowing.
#[must_use]
pub fn horizon(now: DateTime<Utc>, limit_before_days: u32) -> DateTime<Utc> {
    let lookahead = TimeDelta::seconds(i64::from(limit_before_days) * SECONDS_PER_DAY);
    now.checked_add_signed(lookahead)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Decide readiness of `window` at `horizon`.
///
/// Not ready when `notBefore >= horizon` or `notAfter <= horizon`, so both
/// boundaries count as not ready. A certificate that only becomes valid after the
/// horizon is also reported not ready.
#[must_use]
pub fn evaluate(window: &ValidityWindow, horizon: DateTime<Utc>) -> Readiness {
    if window.not_before >= horizon || window.not_after <= horizon {
        Readiness::NotReady
    } else {
        Readiness::Ready
    }
}

/// How long until the verdict for `window` can change as wall-clock time advances.
///
/// The horizon moves forward with the clock, so a `Ready` certificate flips once the
/// horizon reaches `notAfter`, and a not-yet-valid certificate flips one second after
/// the horizon passes `notBefore`. Returns `None` when the verdict is final.
#[must_use]
pub fn next_transition(window: &ValidityWindow, horizon: DateTime<Utc>) -> Option<Duration> {
    let delta = match evaluate(window, horizon) {
        Readiness::Ready => window.not_after - horizon,
        Readiness::NotReady if window.not_before >= horizon && window.not_after > window.not_before => {
            (window.not_before - horizon) + TimeDelta::seconds(1)
        }
        Readiness::NotReady => return None,
    };
    delta.to_std().ok()
}

#[cfg(test)]
#[path = "certificate_tests.rs"]
mod certificate_tests;
