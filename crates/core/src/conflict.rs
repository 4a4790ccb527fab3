//! Classifier output: conflicts between one event and one constraint.

use serde::{Deserialize, Serialize};

use crate::constraint::Category;

/// How serious a conflict is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Soft,
    Hard,
}

/// A relation between one event and one constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    /// The event's `sequence_index`.
    pub event_id: u64,
    pub constraint_id: String,
    /// Category of the violated constraint, carried for aggregation.
    pub category: Category,
    pub severity: Severity,
    /// Whether the violation could later be explained away.
    pub reversible: bool,
    /// Effective precedence of the violated constraint.
    pub precedence: f64,
}

impl Conflict {
    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }
}

/// A conflict with its temporal weight and resulting contribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedConflict {
    #[serde(flatten)]
    pub conflict: Conflict,
    /// Normalized narrative position of the event, in [0, 1].
    pub position: f64,
    /// Temporal weight in [0, 1]. Hard conflicts bypass weighting and carry 1.
    pub weight: f64,
    /// Pressure this conflict feeds into its category, in [0, 1].
    pub contribution: f64,
}

impl WeightedConflict {
    pub fn sequence_index(&self) -> u64 {
        self.conflict.event_id
    }
}
