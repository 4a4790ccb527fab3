//! Narrative event model.
//!
//! Extraction collaborators hand the engine [`EventRecord`]s, whose required
//! fields may be missing. The engine promotes each record to an [`Event`]
//! (or rejects it as malformed) exactly once, in narrative order.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How freely the actor performed the action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Voluntariness {
    Voluntary,
    Coerced,
    #[default]
    Unknown,
}

impl std::fmt::Display for Voluntariness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voluntary => write!(f, "voluntary"),
            Self::Coerced => write!(f, "coerced"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A raw event as produced by narrative extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<u64>,

    /// In-story time as a fraction of the story span, when it differs from
    /// telling order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub voluntariness: Voluntariness,

    /// The text reports that the action did *not* happen.
    #[serde(default)]
    pub negation: bool,

    /// The text frames the action as regretted or unavoidable.
    #[serde(default)]
    pub justified: bool,

    /// Why the raw input could not be decoded into a record, if it could not.
    #[serde(skip)]
    pub unreadable: Option<String>,
}

impl EventRecord {
    /// Start a record with the three required fields set.
    pub fn new(sequence_index: u64, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            sequence_index: Some(sequence_index),
            actor: Some(actor.into()),
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// A placeholder for input that failed to decode, keeping its stream slot.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            unreadable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_voluntariness(mut self, voluntariness: Voluntariness) -> Self {
        self.voluntariness = voluntariness;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negation = true;
        self
    }

    pub fn justified(mut self) -> Self {
        self.justified = true;
        self
    }

    pub fn with_narrative_time(mut self, narrative_time: f64) -> Self {
        self.narrative_time = Some(narrative_time);
        self
    }

    /// Promote the record to a well-formed [`Event`].
    ///
    /// `position` is the record's offset in the input stream and is only used
    /// for error reporting.
    pub fn into_event(self, position: usize) -> Result<Event, Error> {
        let malformed = |reason: &str| Error::MalformedEvent {
            position,
            reason: reason.into(),
        };

        if let Some(reason) = &self.unreadable {
            return Err(malformed(reason));
        }

        let sequence_index = self
            .sequence_index
            .ok_or_else(|| malformed("missing sequence_index"))?;
        let actor = self
            .actor
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| malformed("missing actor"))?;
        let action = self
            .action
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| malformed("missing action"))?;
        if let Some(t) = self.narrative_time {
            if !(t.is_finite() && (0.0..=1.0).contains(&t)) {
                return Err(malformed("narrative_time must be within [0, 1]"));
            }
        }

        Ok(Event {
            sequence_index,
            narrative_time: self.narrative_time,
            actor,
            action,
            target: self.target.filter(|t| !t.trim().is_empty()),
            voluntariness: self.voluntariness,
            negation: self.negation,
            justified: self.justified,
        })
    }
}

/// One well-formed unit of narrative action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub sequence_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_time: Option<f64>,
    pub actor: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub voluntariness: Voluntariness,
    pub negation: bool,
    pub justified: bool,
}

impl Event {
    /// Whether the action actually took place.
    pub fn occurred(&self) -> bool {
        !self.negation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_record_promotes() {
        let event = EventRecord::new(50, "protagonist", "betray")
            .with_target("Ally")
            .with_voluntariness(Voluntariness::Voluntary)
            .into_event(0)
            .unwrap();
        assert_eq!(event.sequence_index, 50);
        assert_eq!(event.target.as_deref(), Some("Ally"));
        assert!(event.occurred());
    }

    #[test]
    fn missing_fields_are_malformed() {
        let mut record = EventRecord::new(3, "a", "b");
        record.actor = None;
        let err = record.into_event(7).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { position: 7, .. }));

        let mut record = EventRecord::new(3, "a", "b");
        record.action = Some("   ".into());
        assert!(record.into_event(0).is_err());

        let mut record = EventRecord::new(3, "a", "b");
        record.sequence_index = None;
        assert!(record.into_event(0).is_err());
    }

    #[test]
    fn unreadable_record_keeps_its_reason() {
        let err = EventRecord::unreadable("unknown variant `forced`")
            .into_event(4)
            .unwrap_err();
        match err {
            Error::MalformedEvent { position, reason } => {
                assert_eq!(position, 4);
                assert_eq!(reason, "unknown variant `forced`");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn narrative_time_out_of_range_is_malformed() {
        let record = EventRecord::new(1, "a", "b").with_narrative_time(1.5);
        assert!(record.into_event(0).is_err());
    }

    #[test]
    fn negation_is_preserved() {
        let event = EventRecord::new(1, "a", "betray")
            .negated()
            .into_event(0)
            .unwrap();
        assert!(event.negation);
        assert!(!event.occurred());
    }

    #[test]
    fn record_from_json_defaults() {
        let json = r#"{"sequence_index": 4, "actor": "Edmond", "action": "flee"}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.voluntariness, Voluntariness::Unknown);
        assert!(!record.negation);
        assert!(!record.justified);
    }
}
