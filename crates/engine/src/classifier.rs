//! Violation classifier.
//!
//! Decides, for one event, which registered constraints it contradicts and
//! how severely. Pure function of the event and the registry.

use loreguard_core::constraint::normalize_term;
use loreguard_core::{Conflict, Event, Severity, Voluntariness};
use tracing::debug;

use crate::registry::{Entry, Registry};

/// Classify one event against the registry.
///
/// Returns every conflict the event produces, highest precedence first
/// (ties keep registry order). Events that contradict nothing yield an
/// empty vector; `Severity::None` conflicts are never emitted.
pub fn classify(event: &Event, registry: &Registry) -> Vec<Conflict> {
    let target = event.target.as_deref().map(normalize_term);

    let mut conflicts: Vec<Conflict> = registry
        .candidates(&event.actor, &event.action)
        .filter(|entry| governs(entry, target.as_deref(), event))
        .filter_map(|entry| {
            let severity = severity(entry, event);
            (severity != Severity::None).then(|| Conflict {
                event_id: event.sequence_index,
                constraint_id: entry.constraint.id.clone(),
                category: entry.constraint.category,
                severity,
                reversible: !entry.constraint.is_veto_eligible(),
                precedence: entry.precedence,
            })
        })
        .collect();

    conflicts.sort_by(|a, b| b.precedence.total_cmp(&a.precedence));

    for conflict in &conflicts {
        debug!(
            index = event.sequence_index,
            constraint = %conflict.constraint_id,
            severity = ?conflict.severity,
            "Conflict classified"
        );
    }
    conflicts
}

/// Whether the constraint's scope covers this event beyond subject/topic.
fn governs(entry: &Entry, event_target: Option<&str>, event: &Event) -> bool {
    let target_ok = match (&entry.target, event_target) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted == actual,
        (Some(_), None) => false,
    };
    target_ok && entry.condition.evaluate(event)
}

/// Severity of the event against one in-scope constraint.
///
/// The event contradicts the constraint when what happened (after its own
/// negation) differs from what the constraint asserts, so a negated event
/// against a negated constraint is compatible.
fn severity(entry: &Entry, event: &Event) -> Severity {
    if entry.constraint.polarity.asserts_occurrence() == event.occurred() {
        return Severity::None;
    }
    if entry.constraint.is_veto_eligible() && event.voluntariness == Voluntariness::Voluntary {
        Severity::Hard
    } else {
        Severity::Soft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loreguard_core::{Category, Constraint, EventRecord, Polarity, Reversibility, Scope};

    fn never_betray_ally() -> Constraint {
        Constraint::new(
            "C2",
            Category::Commitment,
            "protagonist",
            Polarity::Negated,
            Scope::action("betray").with_target("Ally"),
        )
        .with_reversibility(Reversibility::Irreversible)
    }

    fn betrayal(voluntariness: Voluntariness) -> EventRecord {
        EventRecord::new(50, "protagonist", "betray")
            .with_target("Ally")
            .with_voluntariness(voluntariness)
    }

    fn run(constraints: Vec<Constraint>, record: EventRecord) -> Vec<Conflict> {
        let registry = Registry::build(constraints).unwrap();
        classify(&record.into_event(0).unwrap(), &registry)
    }

    #[test]
    fn voluntary_irreversible_violation_is_hard() {
        let conflicts = run(vec![never_betray_ally()], betrayal(Voluntariness::Voluntary));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Hard);
        assert!(!conflicts[0].reversible);
        assert_eq!(conflicts[0].event_id, 50);
    }

    #[test]
    fn coerced_or_unknown_never_hard() {
        for voluntariness in [Voluntariness::Coerced, Voluntariness::Unknown] {
            let conflicts = run(vec![never_betray_ally()], betrayal(voluntariness));
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].severity, Severity::Soft);
        }
    }

    #[test]
    fn context_dependent_violation_is_soft() {
        let c = never_betray_ally().with_reversibility(Reversibility::ContextDependent);
        let conflicts = run(vec![c], betrayal(Voluntariness::Voluntary));
        assert_eq!(conflicts[0].severity, Severity::Soft);
        assert!(conflicts[0].reversible);
    }

    #[test]
    fn double_negation_cancels() {
        let record = betrayal(Voluntariness::Voluntary).negated();
        assert!(run(vec![never_betray_ally()], record).is_empty());
    }

    #[test]
    fn negated_event_violates_positive_constraint() {
        let protects = Constraint::new(
            "C7",
            Category::IdentityTrait,
            "protagonist",
            Polarity::Positive,
            Scope::action("protect").with_target("Ally"),
        );
        let failed = EventRecord::new(10, "protagonist", "protect")
            .with_target("ally")
            .negated();
        let conflicts = run(vec![protects.clone()], failed);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Soft);

        let kept = EventRecord::new(11, "protagonist", "protect").with_target("Ally");
        assert!(run(vec![protects], kept).is_empty());
    }

    #[test]
    fn out_of_scope_events_do_not_conflict() {
        let other_target = EventRecord::new(1, "protagonist", "betray").with_target("Rival");
        assert!(run(vec![never_betray_ally()], other_target).is_empty());

        let untargeted = EventRecord::new(1, "protagonist", "betray");
        assert!(run(vec![never_betray_ally()], untargeted).is_empty());

        let other_actor = EventRecord::new(1, "ally", "betray").with_target("Ally");
        assert!(run(vec![never_betray_ally()], other_actor).is_empty());
    }

    #[test]
    fn condition_narrows_scope() {
        let c = Constraint::new(
            "C1",
            Category::Belief,
            "protagonist",
            Polarity::Negated,
            Scope::action("obey").with_condition(r#"target MATCHES "(?i)king|magistrate""#),
        );
        let conflicts = run(vec![c.clone()], EventRecord::new(3, "protagonist", "obey").with_target("the Magistrate"));
        assert_eq!(conflicts.len(), 1);
        assert!(run(vec![c], EventRecord::new(3, "protagonist", "obey").with_target("mother")).is_empty());
    }

    #[test]
    fn multiple_conflicts_ordered_by_precedence() {
        let fear = Constraint::new(
            "C-fear",
            Category::Fear,
            "protagonist",
            Polarity::Negated,
            Scope::action("betray"),
        );
        let identity = Constraint::new(
            "C-id",
            Category::IdentityTrait,
            "protagonist",
            Polarity::Negated,
            Scope::action("betray"),
        );
        let conflicts = run(
            vec![fear, identity, never_betray_ally()],
            betrayal(Voluntariness::Coerced),
        );
        let ids: Vec<&str> = conflicts.iter().map(|c| c.constraint_id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C-id", "C-fear"]);
    }

    #[test]
    fn classification_is_pure() {
        let registry = Registry::build(vec![never_betray_ally()]).unwrap();
        let event = betrayal(Voluntariness::Voluntary).into_event(0).unwrap();
        assert_eq!(classify(&event, &registry), classify(&event, &registry));
    }
}
