//! Constraint registry: the backstory's constraint set, indexed once.
//!
//! Constraints are keyed by `(subject, topic)` where the topic is the scope's
//! action or one of its aliases, both normalized. Each lookup hashes
//! once; the registry is immutable after [`Registry::build`].

use std::collections::HashMap;

use loreguard_config::PrecedenceTable;
use loreguard_core::constraint::normalize_term;
use loreguard_core::{Constraint, Error, Result};
use tracing::debug;

use crate::condition::{Condition, parse_condition};

/// A constraint together with everything resolved at build time.
#[derive(Debug, Clone)]
pub struct Entry {
    pub constraint: Constraint,
    /// Declared precedence, else the category's configured precedence.
    pub precedence: f64,
    /// Normalized scope target, if the scope is narrowed to one.
    pub target: Option<String>,
    /// Compiled scope condition.
    pub condition: Condition,
}

/// Read-only, indexed constraint set.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<(String, String), Vec<usize>>,
    by_id: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry using the default category precedence table.
    pub fn build(constraints: impl IntoIterator<Item = Constraint>) -> Result<Self> {
        Self::with_precedence(constraints, &PrecedenceTable::default())
    }

    /// Build a registry, resolving undeclared precedence from `table`.
    ///
    /// Fails on the first duplicate id or malformed constraint; no partial
    /// registry is returned.
    pub fn with_precedence(
        constraints: impl IntoIterator<Item = Constraint>,
        table: &PrecedenceTable,
    ) -> Result<Self> {
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut entries = Vec::new();
        let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();

        for constraint in constraints {
            if by_id.contains_key(&constraint.id) {
                return Err(Error::DuplicateConstraintId {
                    id: constraint.id.clone(),
                });
            }
            constraint.validate()?;

            let condition = parse_condition(&constraint.scope.condition).map_err(|detail| {
                Error::InvalidConstraint {
                    id: constraint.id.clone(),
                    reason: format!("scope condition: {detail}"),
                }
            })?;

            let slot = entries.len();
            by_id.insert(constraint.id.clone(), slot);
            let subject = normalize_term(&constraint.subject);
            for topic in constraint.scope.topics() {
                index.entry((subject.clone(), topic)).or_default().push(slot);
            }

            let precedence = constraint
                .precedence
                .unwrap_or_else(|| table.get(constraint.category));
            let target = constraint
                .scope
                .target
                .as_deref()
                .map(normalize_term)
                .filter(|t| !t.is_empty());

            entries.push(Entry {
                constraint,
                precedence,
                target,
                condition,
            });
        }

        debug!(
            constraints = entries.len(),
            keys = index.len(),
            "Constraint registry built"
        );
        Ok(Self {
            entries,
            index,
            by_id,
        })
    }

    /// Constraints governing `topic` for `subject`, in insertion order.
    pub fn lookup_by_subject_and_topic(&self, subject: &str, topic: &str) -> Vec<&Constraint> {
        self.candidates(subject, topic)
            .map(|entry| &entry.constraint)
            .collect()
    }

    /// Registry entries governing `topic` for `subject`, in insertion order.
    pub fn candidates(&self, subject: &str, topic: &str) -> impl Iterator<Item = &Entry> {
        let key = (normalize_term(subject), normalize_term(topic));
        self.index
            .get(&key)
            .into_iter()
            .flatten()
            .map(|&slot| &self.entries[slot])
    }

    /// Look up a constraint by id.
    pub fn get(&self, id: &str) -> Option<&Constraint> {
        self.by_id.get(id).map(|&slot| &self.entries[slot].constraint)
    }

    /// All constraints in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter().map(|e| &e.constraint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
