//! Consistency decision. Turns veto state and aggregate pressure into the
//! final [`Verdict`].

use std::collections::BTreeMap;

use loreguard_core::{Category, SkippedEvent, Verdict, Veto, WeightedConflict};
use tracing::info;

/// Audit material carried into the verdict alongside the decision.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub conflicts: Vec<WeightedConflict>,
    pub category_pressures: BTreeMap<Category, f64>,
    pub skipped_events: Vec<SkippedEvent>,
    pub events_processed: usize,
}

/// Decide with no audit trail attached.
pub fn decide(veto: Option<Veto>, aggregate_pressure: f64, threshold: f64) -> Verdict {
    decide_with_trace(veto, aggregate_pressure, threshold, Trace::default())
}

/// Decide and attach the audit trail.
///
/// A veto always yields an inconsistent verdict; otherwise the backstory is
/// consistent iff `aggregate_pressure < threshold`. Contributing conflicts
/// are ordered by `sequence_index` (stable within one event).
pub fn decide_with_trace(
    veto: Option<Veto>,
    aggregate_pressure: f64,
    threshold: f64,
    trace: Trace,
) -> Verdict {
    let is_consistent = veto.is_none() && aggregate_pressure < threshold;

    let mut conflicts = trace.conflicts;
    conflicts.sort_by_key(WeightedConflict::sequence_index);

    match &veto {
        Some(v) => info!(
            constraint = %v.constraint_id,
            index = v.event_id,
            pressure = aggregate_pressure,
            "Verdict: inconsistent (vetoed)"
        ),
        None => info!(
            pressure = aggregate_pressure,
            threshold,
            conflicts = conflicts.len(),
            "Verdict: {}",
            if is_consistent { "consistent" } else { "inconsistent" }
        ),
    }

    Verdict {
        is_consistent,
        vetoed_by: veto,
        aggregate_pressure,
        threshold,
        contributing_conflicts: conflicts,
        category_pressures: trace.category_pressures,
        skipped_events: trace.skipped_events,
        events_processed: trace.events_processed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loreguard_core::{Conflict, Severity};

    fn weighted(event_id: u64, id: &str) -> WeightedConflict {
        WeightedConflict {
            conflict: Conflict {
                event_id,
                constraint_id: id.into(),
                category: Category::Belief,
                severity: Severity::Soft,
                reversible: true,
                precedence: 2.0,
            },
            position: 0.5,
            weight: 0.5,
            contribution: 0.5,
        }
    }

    #[test]
    fn pressure_below_threshold_is_consistent() {
        let v = decide(None, 1.99, 2.0);
        assert!(v.is_consistent);
        assert_eq!(v.label(), 1);
    }

    #[test]
    fn pressure_at_threshold_is_inconsistent() {
        assert!(!decide(None, 2.0, 2.0).is_consistent);
        assert!(!decide(None, 7.5, 2.0).is_consistent);
    }

    #[test]
    fn veto_overrides_low_pressure() {
        let veto = Veto {
            constraint_id: "C2".into(),
            event_id: 50,
        };
        let v = decide(Some(veto.clone()), 0.0, 2.0);
        assert!(!v.is_consistent);
        assert_eq!(v.vetoed_by, Some(veto));
        assert_eq!(v.aggregate_pressure, 0.0);
    }

    #[test]
    fn contributing_conflicts_sorted_by_sequence_index() {
        let trace = Trace {
            conflicts: vec![weighted(9, "a"), weighted(2, "b"), weighted(9, "c"), weighted(4, "d")],
            events_processed: 4,
            ..Trace::default()
        };
        let v = decide_with_trace(None, 0.1, 2.0, trace);
        let order: Vec<(u64, &str)> = v
            .contributing_conflicts
            .iter()
            .map(|c| (c.sequence_index(), c.conflict.constraint_id.as_str()))
            .collect();
        assert_eq!(order, vec![(2, "b"), (4, "d"), (9, "a"), (9, "c")]);
        assert_eq!(v.events_processed, 4);
    }
}
