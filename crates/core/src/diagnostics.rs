//! Field snapshots for debugging solver runs.
//!
//! A [`DebugContainer`] collects labelled copies of intermediate fields at
//! fixed slots so a failing time step can be inspected after the fact. It is
//! an ordinary value: the solver owns one and passes it where snapshots are
//! taken.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::field::SpectralField;

#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub description: String,
    pub field: SpectralField,
}

#[derive(Debug, Default)]
pub struct DebugContainer {
    entries: Vec<Option<DebugEntry>>,
}

impl DebugContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `field` in slot `index`, replacing any previous entry.
    pub fn set(&mut self, index: usize, field: &SpectralField, description: impl Into<String>) {
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let description = description.into();
        debug!("debug container: slot {index} <- '{description}'");
        self.entries[index] = Some(DebugEntry {
            description,
            field: field.clone(),
        });
    }

    pub fn get(&self, index: usize) -> Option<&DebugEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Occupied slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DebugEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index, entry)))
    }

    /// Summaries of every occupied slot, labelled with their descriptions.
    pub fn summaries(&self) -> Vec<FieldSummary> {
        self.iter()
            .map(|(_, entry)| FieldSummary::of(&entry.field, &entry.description))
            .collect()
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Scalar statistics of one field, cheap to log or serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub label: String,
    pub max: f64,
    pub min: f64,
    pub rms: f64,
    pub sum: f64,
    pub all_finite: bool,
    pub physical_valid: bool,
    pub spectral_valid: bool,
}

impl FieldSummary {
    /// Summarize `field` through its physical representation.
    ///
    /// The validity flags are recorded before the reductions run, so they
    /// describe the field as it was handed in.
    pub fn of(field: &SpectralField, label: &str) -> Self {
        let physical_valid = field.is_physical_valid();
        let spectral_valid = field.is_spectral_valid();
        Self {
            label: label.to_string(),
            max: field.reduce_max(),
            min: field.reduce_min(),
            rms: field.reduce_rms_quad(),
            sum: field.reduce_sum_quad(),
            all_finite: field.reduce_all_finite(),
            physical_valid,
            spectral_valid,
        }
    }
}
