//! Temporal weighting of conflicts.
//!
//! Later events carry more evidentiary weight than earlier ones: the
//! normalized narrative position is raised to a fixed exponent and clipped
//! to `[min_weight, 1]`. Hard conflicts bypass weighting entirely.

use loreguard_config::{EngineConfig, TemporalBasis};
use loreguard_core::{Conflict, Event, Voluntariness, WeightedConflict};

/// Declared weighting policy, copied out of [`EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalWeighting {
    pub exponent: f64,
    pub min_weight: f64,
    pub basis: TemporalBasis,
    pub coercion_discount: f64,
    pub justification_discount: f64,
}

impl TemporalWeighting {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            exponent: config.weighting_exponent,
            min_weight: config.min_weight,
            basis: config.temporal_basis,
            coercion_discount: config.coercion_discount,
            justification_discount: config.justification_discount,
        }
    }

    /// Normalized position of the event in `[0, 1]`.
    pub fn position(&self, event: &Event, narrative_length: usize) -> f64 {
        if self.basis == TemporalBasis::NarrativeTime {
            if let Some(t) = event.narrative_time {
                return t.clamp(0.0, 1.0);
            }
        }
        if narrative_length == 0 {
            return 1.0;
        }
        (event.sequence_index as f64 / narrative_length as f64).clamp(0.0, 1.0)
    }

    /// Temporal weight of a conflict, in `[min_weight, 1]`.
    ///
    /// Monotonically non-decreasing in the event's position.
    pub fn weight(&self, conflict: &Conflict, event: &Event, narrative_length: usize) -> f64 {
        if conflict.is_hard() {
            return 1.0;
        }
        self.position(event, narrative_length)
            .powf(self.exponent)
            .clamp(self.min_weight, 1.0)
    }

    /// Weight a conflict and compute the pressure it feeds its category.
    ///
    /// `strength` is the violated constraint's magnitude. Coerced and
    /// justified events are discounted.
    pub fn weigh(
        &self,
        conflict: Conflict,
        event: &Event,
        narrative_length: usize,
        strength: f64,
    ) -> WeightedConflict {
        let position = self.position(event, narrative_length);
        let weight = self.weight(&conflict, event, narrative_length);
        let mut contribution = weight * strength;
        if event.voluntariness == Voluntariness::Coerced {
            contribution *= self.coercion_discount;
        }
        if event.justified {
            contribution *= self.justification_discount;
        }
        WeightedConflict {
            conflict,
            position,
            weight,
            contribution: contribution.clamp(0.0, 1.0),
        }
    }
}

impl Default for TemporalWeighting {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
