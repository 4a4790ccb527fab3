//! Backstory and narrative file formats.
//!
//! A backstory is a list of constraints, either as TOML `[[constraints]]`
//! tables or as JSON (a bare array or `{ "constraints": [...] }`). A
//! narrative is JSON Lines, one event record per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use loreguard_core::{Constraint, EventRecord};
use serde::Deserialize;
use tracing::{debug, warn};

/// Errors raised while reading input files.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML backstory {path}: {reason}")]
    Toml { path: PathBuf, reason: String },

    #[error("Failed to parse JSON backstory {path}: {reason}")]
    Json { path: PathBuf, reason: String },
}

#[derive(Deserialize)]
struct Backstory {
    #[serde(default)]
    constraints: Vec<Constraint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBackstory {
    List(Vec<Constraint>),
    Table(Backstory),
}

/// Read a backstory file. `.json` files are parsed as JSON, anything else as TOML.
pub fn load_constraints(path: &Path) -> Result<Vec<Constraint>, FixtureError> {
    let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let constraints = parse_constraints(&content, is_json(path)).map_err(|reason| {
        if is_json(path) {
            FixtureError::Json {
                path: path.to_path_buf(),
                reason,
            }
        } else {
            FixtureError::Toml {
                path: path.to_path_buf(),
                reason,
            }
        }
    })?;
    debug!(path = %path.display(), constraints = constraints.len(), "Backstory loaded");
    Ok(constraints)
}

/// Parse backstory text in either format.
pub fn parse_constraints(content: &str, json: bool) -> Result<Vec<Constraint>, String> {
    if json {
        match serde_json::from_str::<JsonBackstory>(content).map_err(|e| e.to_string())? {
            JsonBackstory::List(constraints) => Ok(constraints),
            JsonBackstory::Table(backstory) => Ok(backstory.constraints),
        }
    } else {
        toml::from_str::<Backstory>(content)
            .map(|b| b.constraints)
            .map_err(|e| e.to_string())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read a whole JSON Lines narrative into memory.
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>, FixtureError> {
    let file = File::open(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let events: Vec<EventRecord> = parse_events(BufReader::new(file))
        .collect::<Result<_, _>>()
        .map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), events = events.len(), "Narrative loaded");
    Ok(events)
}

/// Lazily parse JSON Lines event records.
///
/// Blank lines are ignored and do not count as stream positions. A line
/// that does not decode yields an [`EventRecord::unreadable`] placeholder
/// carrying the decoder's message, so the engine's malformed-event policy
/// decides its fate at the right position.
pub fn parse_events<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<EventRecord, std::io::Error>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .enumerate()
        .map(|(position, (line_no, line))| {
            let line = line?;
            Ok(serde_json::from_str(&line).unwrap_or_else(|err| {
                warn!(position, line = line_no + 1, error = %err, "Unreadable event record");
                EventRecord::unreadable(format!("invalid event record: {err}"))
            }))
        })
}
