// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `SSL` resources.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (`Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! A condition list holds at most one entry per `type`. [`upsert_condition`] keeps
//! that invariant: it replaces an entry of the same type in place and only appends
//! when the type is new.
//!
//! # Example
//!
//! ```rust,no_run
//! use certwatch::crd::ConditionStatus;
//! use certwatch::reconcilers::status::{create_condition, upsert_condition};
//!
//! let mut conditions = Vec::new();
//! upsert_condition(
//!     &mut conditions,
//!     create_condition("Ready", ConditionStatus::True, None, None),
//! );
//! assert_eq!(conditions.len(), 1);
//! ```

use crate::crd::{Condition, ConditionStatus};
use chrono::Utc;

/// Create a new condition stamped with the current time.
///
/// # Arguments
///
/// * `condition_type` - The type of condition (e.g., "Ready")
/// * `status` - The condition status
/// * `reason` - A programmatic identifier in `CamelCase`, if any
/// * `message` - A human-readable explanation, if any
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: ConditionStatus,
    reason: Option<&str>,
    message: Option<&str>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status,
        reason: reason.map(str::to_string),
        message: message.map(str::to_string),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Merge `condition` into `conditions` by type (in-memory, no API call).
///
/// An existing entry of the same type is replaced in place, keeping its position and,
/// when the status is unchanged, its `lastTransitionTime`. Reason and message always
/// come from `condition`, so a verdict without them clears stale ones. A new type is
/// appended.
pub fn upsert_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.r#type == condition.r#type)
    {
        Some(existing) => {
            let last_transition_time = if existing.status == condition.status {
                existing
                    .last_transition_time
                    .take()
                    .or(condition.last_transition_time)
            } else {
                condition.last_transition_time
            };

            *existing = Condition {
                last_transition_time,
                ..condition
            };
        }
        None => conditions.push(condition),
    }
}

/// Compare two condition lists semantically.
///
/// Ignores `lastTransitionTime` and ordering; compares type, status, reason and message.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
