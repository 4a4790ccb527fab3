//! # loreguard core
//!
//! Domain types and error definitions for the loreguard backstory
//! consistency engine. This crate has **no engine logic**; it defines the
//! records exchanged between the extraction collaborators, the engine and
//! the presentation layer.
//!
//! ## Record flow
//!
//! ```text
//! Constraint ──▶ Registry          EventRecord ──▶ Event
//!                    │                                │
//!                    └──────────▶ classify ◀──────────┘
//!                                    │
//!                                 Conflict ──▶ WeightedConflict ──▶ Verdict
//! ```

pub mod conflict;
pub mod constraint;
pub mod error;
pub mod event;
pub mod verdict;

// Re-export key types at crate root for ergonomics
pub use conflict::{Conflict, Severity, WeightedConflict};
pub use constraint::{Category, Constraint, Polarity, Reversibility, Scope};
pub use error::{Error, Result};
pub use event::{Event, EventRecord, Voluntariness};
pub use verdict::{SkippedEvent, Verdict, Veto};
