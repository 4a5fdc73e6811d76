// src/pipeline/diff.rs

//! Diff calculation between availability snapshots.
//!
//! Identity is the `(room, date)` key only. A tuple whose count or price
//! changed while its key stayed present is not a change.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::AvailabilityTuple;

/// Per-cycle comparison of the current and previous available sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Present now, absent from the previous snapshot
    pub new_available: Vec<AvailabilityTuple>,
    /// Present in the previous snapshot, absent now
    pub lost_available: Vec<AvailabilityTuple>,
    /// This cycle's full available set
    pub current_available: Vec<AvailabilityTuple>,
}

impl DiffResult {
    /// Check if any key appeared or disappeared.
    pub fn has_changes(&self) -> bool {
        !self.new_available.is_empty() || !self.lost_available.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new_available.len() + self.lost_available.len()
    }
}

/// Compare `current` against `previous`. Input order is preserved in the
/// output lists.
pub fn diff(current: &[AvailabilityTuple], previous: &[AvailabilityTuple]) -> DiffResult {
    let prev_keys: HashSet<(&str, &str)> = previous.iter().map(AvailabilityTuple::key).collect();
    let curr_keys: HashSet<(&str, &str)> = current.iter().map(AvailabilityTuple::key).collect();

    // Added: in current but not in previous
    let new_available = current
        .iter()
        .filter(|t| !prev_keys.contains(&t.key()))
        .cloned()
        .collect();

    // Removed: in previous but not in current
    let lost_available = previous
        .iter()
        .filter(|t| !curr_keys.contains(&t.key()))
        .cloned()
        .collect();

    DiffResult {
        new_available,
        lost_available,
        current_available: current.to_vec(),
    }
}
