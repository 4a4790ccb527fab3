//! The evaluation pipeline.
//!
//! Events are pulled one at a time, in narrative order, through
//! classify → weigh → (veto | aggregate). The running state is an explicit
//! fold accumulator ([`Evaluation`]); nothing is shared or mutated outside
//! it. After a veto the event source is dropped without being drained.

use std::ops::ControlFlow;

use loreguard_config::{EngineConfig, MalformedEventPolicy};
use loreguard_core::{Constraint, Error, Event, EventRecord, Result, SkippedEvent, Verdict};
use tracing::{debug, warn};

use crate::aggregator::AggregateState;
use crate::classifier::classify;
use crate::decision::{Trace, decide_with_trace};
use crate::registry::Registry;
use crate::veto::VetoState;
use crate::weighting::TemporalWeighting;

/// A validated configuration plus the registry built from one backstory.
///
/// Immutable once built; it can evaluate any number of narratives and be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct ConsistencyEngine {
    registry: Registry,
    config: EngineConfig,
    weighting: TemporalWeighting,
}

impl ConsistencyEngine {
    /// Validate `config` and build the constraint registry.
    pub fn new(
        constraints: impl IntoIterator<Item = Constraint>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Registry::with_precedence(constraints, &config.precedence)?;
        let weighting = TemporalWeighting::from_config(&config);
        Ok(Self {
            registry,
            config,
            weighting,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a narrative whose length is known from the iterator itself.
    pub fn evaluate<I>(&self, events: I) -> Result<Verdict>
    where
        I: IntoIterator<Item = EventRecord>,
        I::IntoIter: ExactSizeIterator,
    {
        let events = events.into_iter();
        let narrative_length = events.len();
        self.evaluate_stream(events, narrative_length)
    }

    /// Evaluate a lazy, single-pass narrative of declared length.
    pub fn evaluate_stream(
        &self,
        events: impl IntoIterator<Item = EventRecord>,
        narrative_length: usize,
    ) -> Result<Verdict> {
        let mut run = self.start(narrative_length);
        for (position, record) in events.into_iter().enumerate() {
            if run.step(position, record)?.is_break() {
                break;
            }
        }
        Ok(run.finish())
    }

    /// Begin a manually driven evaluation.
    pub fn start(&self, narrative_length: usize) -> Evaluation<'_> {
        Evaluation {
            engine: self,
            narrative_length,
            veto: VetoState::default(),
            aggregate: AggregateState::from_config(&self.config),
            trace: Trace::default(),
            last_index: None,
        }
    }
}

/// Running state of one evaluation.
#[derive(Debug)]
pub struct Evaluation<'e> {
    engine: &'e ConsistencyEngine,
    narrative_length: usize,
    veto: VetoState,
    aggregate: AggregateState,
    trace: Trace,
    last_index: Option<u64>,
}

impl Evaluation<'_> {
    /// Feed the record at stream offset `position`.
    ///
    /// Returns `Break` once the evaluation is vetoed; further records are
    /// ignored. Fails only when a malformed record meets the `abort` policy.
    pub fn step(&mut self, position: usize, record: EventRecord) -> Result<ControlFlow<()>> {
        if self.veto.is_vetoed() {
            return Ok(ControlFlow::Break(()));
        }

        let event = match self.admit(position, record) {
            Ok(event) => event,
            Err(err) => return self.reject(position, err),
        };
        self.last_index = Some(event.sequence_index);
        self.trace.events_processed += 1;

        let registry = &self.engine.registry;
        for conflict in classify(&event, registry) {
            let strength = registry
                .get(&conflict.constraint_id)
                .map_or(1.0, |c| c.strength);
            let hard = conflict.is_hard();
            let weighted =
                self.engine
                    .weighting
                    .weigh(conflict, &event, self.narrative_length, strength);

            if hard {
                let state = std::mem::take(&mut self.veto);
                self.veto = state.observe(&weighted.conflict);
            } else {
                self.aggregate.accumulate_in_place(&weighted);
            }
            debug!(
                index = event.sequence_index,
                constraint = %weighted.conflict.constraint_id,
                weight = weighted.weight,
                contribution = weighted.contribution,
                "Conflict weighted"
            );
            self.trace.conflicts.push(weighted);
        }

        if self.veto.is_vetoed() {
            Ok(ControlFlow::Break(()))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    /// Promote a record, enforcing required fields and narrative order.
    fn admit(&self, position: usize, record: EventRecord) -> Result<Event> {
        let event = record.into_event(position)?;
        if let Some(last) = self.last_index {
            if event.sequence_index < last {
                return Err(Error::MalformedEvent {
                    position,
                    reason: format!(
                        "sequence_index {} precedes previous event {last}",
                        event.sequence_index
                    ),
                });
            }
        }
        Ok(event)
    }

    fn reject(&mut self, position: usize, err: Error) -> Result<ControlFlow<()>> {
        match self.engine.config.malformed_events {
            MalformedEventPolicy::Abort => Err(err),
            MalformedEventPolicy::Skip => {
                let reason = match err {
                    Error::MalformedEvent { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(position, reason = %reason, "Skipping malformed event");
                self.trace.skipped_events.push(SkippedEvent { position, reason });
                Ok(ControlFlow::Continue(()))
            }
        }
    }

    pub fn is_vetoed(&self) -> bool {
        self.veto.is_vetoed()
    }

    /// Current aggregate pressure.
    pub fn pressure(&self) -> f64 {
        self.aggregate.finalize()
    }

    /// Produce the verdict. Consumes the evaluation.
    pub fn finish(mut self) -> Verdict {
        let veto = self.veto.finish().into_veto();
        self.trace.category_pressures = self.aggregate.category_pressures();
        decide_with_trace(
            veto,
            self.aggregate.finalize(),
            self.engine.config.threshold,
            self.trace,
        )
    }
}

/// Evaluate `events` against `constraints` under `config`.
pub fn evaluate<I>(
    constraints: impl IntoIterator<Item = Constraint>,
    events: I,
    config: &EngineConfig,
) -> Result<Verdict>
where
    I: IntoIterator<Item = EventRecord>,
    I::IntoIter: ExactSizeIterator,
{
    ConsistencyEngine::new(constraints, config.clone())?.evaluate(events)
}

/// Evaluate a lazy event source of declared length.
pub fn evaluate_stream(
    constraints: impl IntoIterator<Item = Constraint>,
    events: impl IntoIterator<Item = EventRecord>,
    narrative_length: usize,
    config: &EngineConfig,
) -> Result<Verdict> {
    ConsistencyEngine::new(constraints, config.clone())?.evaluate_stream(events, narrative_length)
}
