//! Backstory consistency engine.
//!
//! Treats a character backstory as a bundle of constraints and checks a
//! narrative, event by event, against them. Evidence accumulates over the
//! whole sequence; a voluntary violation of an irreversible constraint
//! vetoes the backstory on the spot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │ EventRecord │──▶│ Classifier │──▶│ Weighting  │──▶│   Veto   │──┐
//! │  (stream)   │   │ (Registry) │   │ (temporal) │   └──────────┘  │
//! └─────────────┘   └────────────┘   └────────────┘         │       ▼
//!                                          │          ┌──────────┐ ┌──────────┐
//!                                          └─────────▶│Aggregator│▶│ Decision │
//!                                                     └──────────┘ └──────────┘
//! ```
//!
//! # Example Backstory
//!
//! ```toml
//! [[constraints]]
//! id = "C2"
//! category = "commitment"
//! subject = "protagonist"
//! polarity = "negated"
//! reversibility = "irreversible"
//! description = "Will never voluntarily betray Ally"
//! scope = { action = "betray", aliases = ["sell out"], target = "Ally" }
//! ```

mod aggregator;
mod classifier;
mod condition;
mod decision;
mod pipeline;
mod registry;
mod veto;
mod weighting;

pub use aggregator::{AggregateState, CategoryPressure};
pub use classifier::classify;
pub use condition::{Condition, parse_condition};
pub use decision::{Trace, decide, decide_with_trace};
pub use pipeline::{ConsistencyEngine, Evaluation, evaluate, evaluate_stream};
pub use registry::{Entry, Registry};
pub use veto::{VetoState, check as check_veto};
pub use weighting::TemporalWeighting;
