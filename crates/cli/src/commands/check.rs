//! `loreguard check` — Evaluate one narrative against one backstory.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use loreguard::fixtures::{FixtureError, load_constraints, load_events, parse_events};
use loreguard_core::Verdict;
use loreguard_engine::ConsistencyEngine;

use super::load_config;

pub async fn run(
    constraints_path: &Path,
    events_path: &Path,
    length: Option<usize>,
    config_path: Option<&Path>,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let constraints = load_constraints(constraints_path)?;
    let engine = ConsistencyEngine::new(constraints, config)?;

    let verdict = match length {
        Some(narrative_length) => stream(&engine, events_path, narrative_length)?,
        None => engine.evaluate(load_events(events_path)?)?,
    };

    println!("{}", verdict.label());
    if trace {
        let report = serde_json::json!({
            "evaluated_at": chrono::Utc::now().to_rfc3339(),
            "verdict": verdict,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Evaluate without holding the narrative in memory.
fn stream(
    engine: &ConsistencyEngine,
    events_path: &Path,
    narrative_length: usize,
) -> Result<Verdict, Box<dyn std::error::Error>> {
    let file = File::open(events_path).map_err(|source| FixtureError::Io {
        path: events_path.to_path_buf(),
        source,
    })?;

    // A read error ends the stream; it is surfaced after the verdict is built.
    let mut read_error = None;
    let events = parse_events(BufReader::new(file)).map_while(|line| match line {
        Ok(record) => Some(record),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });
    let verdict = engine.evaluate_stream(events, narrative_length)?;
    if let Some(source) = read_error {
        return Err(FixtureError::Io {
            path: events_path.to_path_buf(),
            source,
        }
        .into());
    }
    Ok(verdict)
}
