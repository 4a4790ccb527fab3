//! The final consistency verdict and its audit trail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conflict::WeightedConflict;
use crate::constraint::Category;

/// The first hard violation found in narrative order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Veto {
    pub constraint_id: String,
    pub event_id: u64,
}

/// A record that could not be promoted to an event and was skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedEvent {
    /// Offset of the record in the input stream.
    pub position: usize,
    pub reason: String,
}

/// The engine's single output for one (backstory, narrative) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub is_consistent: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vetoed_by: Option<Veto>,

    /// Scalar soft-conflict pressure. Reported even when a veto decided.
    pub aggregate_pressure: f64,

    /// The threshold the pressure was compared against.
    pub threshold: f64,

    /// Every retained conflict, ordered by `sequence_index`.
    #[serde(default)]
    pub contributing_conflicts: Vec<WeightedConflict>,

    /// Per-category pressure before precedence scaling.
    #[serde(default)]
    pub category_pressures: BTreeMap<Category, f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_events: Vec<SkippedEvent>,

    /// Well-formed events classified before the verdict was reached.
    pub events_processed: usize,
}

impl Verdict {
    /// Program output convention: `1` consistent, `0` inconsistent.
    pub fn label(&self) -> u8 {
        u8::from(self.is_consistent)
    }

    pub fn is_vetoed(&self) -> bool {
        self.vetoed_by.is_some()
    }
}
