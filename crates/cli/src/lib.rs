//! Loading and batch-running support for the `loreguard` binary.
//!
//! - [`fixtures`] reads backstories (TOML or JSON) and narratives (JSON Lines)
//! - [`batch`] evaluates many independent cases from a manifest

pub mod batch;
pub mod fixtures;

pub use batch::{CaseOutcome, Manifest, ManifestCase, run_manifest, to_csv};
pub use fixtures::{FixtureError, load_constraints, load_events, parse_constraints, parse_events};
