//! Constraint data model: one bounding fact derived from a backstory.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kind of bound a constraint places on the character.
///
/// A closed set: category-specific behavior (default reversibility,
/// precedence) is looked up from tables rather than dispatched dynamically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Belief,
    Commitment,
    Fear,
    Capability,
    IdentityTrait,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 5] = [
        Category::Belief,
        Category::Commitment,
        Category::Fear,
        Category::Capability,
        Category::IdentityTrait,
    ];

    /// Reversibility applied when a constraint does not declare its own.
    ///
    /// Broken commitments and impossible capability jumps cannot be
    /// explained away later; beliefs, fears and self-image can drift.
    pub fn default_reversibility(self) -> Reversibility {
        match self {
            Category::Commitment | Category::Capability => Reversibility::Irreversible,
            Category::Belief | Category::Fear | Category::IdentityTrait => {
                Reversibility::ContextDependent
            }
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Belief => write!(f, "belief"),
            Self::Commitment => write!(f, "commitment"),
            Self::Fear => write!(f, "fear"),
            Self::Capability => write!(f, "capability"),
            Self::IdentityTrait => write!(f, "identity_trait"),
        }
    }
}

/// Whether a constraint asserts that its scoped action holds or does not.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// "always protects X", "can read".
    Positive,
    /// "will never betray X", "cannot swim".
    #[default]
    Negated,
}

impl Polarity {
    /// `true` when the constraint asserts the scoped action happens.
    pub fn asserts_occurrence(self) -> bool {
        matches!(self, Polarity::Positive)
    }
}

/// Whether crossing a constraint can later be explained away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    Irreversible,
    ContextDependent,
}

/// The situations a constraint governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// Primary action (topic) the constraint is about, e.g. `betray`.
    pub action: String,

    /// Alternative action names indexed alongside `action`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Restrict the scope to one target. `None` governs every target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Optional condition expression over event fields,
    /// e.g. `target == "Ally" OR target == "Mentor"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

impl Scope {
    /// A scope over a single action and any target.
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            aliases: Vec::new(),
            target: None,
            condition: String::new(),
        }
    }

    /// Narrow this scope to a single target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add an alternative action name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Attach a condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Normalized topics (primary action first, then aliases, deduplicated).
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::with_capacity(1 + self.aliases.len());
        for raw in std::iter::once(&self.action).chain(self.aliases.iter()) {
            let topic = normalize_term(raw);
            if !topic.is_empty() && !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }
}

/// A single bounding fact extracted from the backstory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    /// Unique identifier within the registry.
    pub id: String,

    pub category: Category,

    /// The entity the constraint is about (normally the protagonist).
    pub subject: String,

    #[serde(default)]
    pub polarity: Polarity,

    pub scope: Scope,

    /// Declared reversibility. Falls back to the category default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversibility: Option<Reversibility>,

    /// Declared precedence. Falls back to the configured category precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precedence: Option<f64>,

    /// Magnitude of a soft violation, in (0, 1].
    #[serde(default = "default_strength")]
    pub strength: f64,

    /// Free-text description kept for the audit trace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_strength() -> f64 {
    1.0
}

impl Constraint {
    /// Create a constraint with category defaults for everything optional.
    pub fn new(
        id: impl Into<String>,
        category: Category,
        subject: impl Into<String>,
        polarity: Polarity,
        scope: Scope,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            subject: subject.into(),
            polarity,
            scope,
            reversibility: None,
            precedence: None,
            strength: default_strength(),
            description: String::new(),
        }
    }

    /// Override the reversibility.
    pub fn with_reversibility(mut self, reversibility: Reversibility) -> Self {
        self.reversibility = Some(reversibility);
        self
    }

    /// Override the precedence.
    pub fn with_precedence(mut self, precedence: f64) -> Self {
        self.precedence = Some(precedence);
        self
    }

    /// Set the soft-violation magnitude.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Effective reversibility (declared, else the category default).
    pub fn reversibility(&self) -> Reversibility {
        self.reversibility
            .unwrap_or_else(|| self.category.default_reversibility())
    }

    /// Only irreversible constraints can ever veto.
    pub fn is_veto_eligible(&self) -> bool {
        self.reversibility() == Reversibility::Irreversible
    }

    /// Validate that the constraint is well-formed.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: &str| Error::InvalidConstraint {
            id: if self.id.is_empty() {
                "(empty)".into()
            } else {
                self.id.clone()
            },
            reason: reason.into(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("constraint id cannot be empty"));
        }
        if self.subject.trim().is_empty() {
            return Err(invalid("subject cannot be empty"));
        }
        if self.scope.topics().is_empty() {
            return Err(invalid("scope action cannot be empty"));
        }
        if !(self.strength.is_finite() && self.strength > 0.0 && self.strength <= 1.0) {
            return Err(invalid("strength must be in (0, 1]"));
        }
        if let Some(p) = self.precedence {
            if !p.is_finite() || p < 0.0 {
                return Err(invalid("precedence must be a finite, non-negative number"));
            }
        }
        Ok(())
    }
}

/// Case- and whitespace-insensitive form used for subject/topic/target keys.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn betrayal() -> Constraint {
        Constraint::new(
            "C2",
            Category::Commitment,
            "protagonist",
            Polarity::Negated,
            Scope::action("betray").with_target("Ally"),
        )
    }

    #[test]
    fn category_defaults_drive_reversibility() {
        assert!(betrayal().is_veto_eligible());

        let fear = Constraint::new(
            "C3",
            Category::Fear,
            "protagonist",
            Polarity::Negated,
            Scope::action("command"),
        );
        assert_eq!(fear.reversibility(), Reversibility::ContextDependent);
        assert!(!fear.is_veto_eligible());

        let pinned = fear.with_reversibility(Reversibility::Irreversible);
        assert!(pinned.is_veto_eligible());
    }

    #[test]
    fn topics_are_normalized_and_deduplicated() {
        let scope = Scope::action("  Betray ")
            .with_alias("sell  out")
            .with_alias("BETRAY");
        assert_eq!(scope.topics(), vec!["betray".to_string(), "sell out".to_string()]);
    }

    #[test]
    fn constraint_from_json_uses_defaults() {
        let json = r#"{
            "id": "C1",
            "category": "identity_trait",
            "subject": "Edmond",
            "scope": { "action": "abandon", "target": "Mercedes" }
        }"#;
        let c: Constraint = serde_json::from_str(json).unwrap();
        assert_eq!(c.polarity, Polarity::Negated);
        assert_eq!(c.strength, 1.0);
        assert!(c.precedence.is_none());
        assert_eq!(c.scope.target.as_deref(), Some("Mercedes"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn invalid_strength_rejected() {
        assert!(betrayal().with_strength(0.0).validate().is_err());
        assert!(betrayal().with_strength(1.5).validate().is_err());
        assert!(betrayal().with_strength(f64::NAN).validate().is_err());
    }

    #[test]
    fn negative_precedence_rejected() {
        let err = betrayal().with_precedence(-1.0).validate().unwrap_err();
        assert!(err.to_string().contains("C2"));
    }

    #[test]
    fn empty_fields_rejected() {
        let mut c = betrayal();
        c.id = String::new();
        assert!(c.validate().is_err());

        let mut c = betrayal();
        c.subject = "  ".into();
        assert!(c.validate().is_err());

        let mut c = betrayal();
        c.scope.action = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn category_display_matches_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json.trim_matches('"'), category.to_string());
        }
    }
}
