//! Batch evaluation of independent (backstory, narrative) cases.
//!
//! Each case gets its own engine and runs on a blocking task; nothing is
//! shared between cases except the read-only configuration. Results are
//! reported in manifest order regardless of completion order.
//!
//! ```toml
//! [[cases]]
//! id = "46"
//! constraints = "backstories/46.toml"
//! events = "narratives/46.jsonl"
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use loreguard_config::EngineConfig;
use loreguard_core::Verdict;
use loreguard_engine::ConsistencyEngine;
use serde::Deserialize;
use tracing::{info, warn};

use crate::fixtures::{load_constraints, load_events};

/// A batch manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub cases: Vec<ManifestCase>,
}

/// One case; relative paths resolve against the manifest's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestCase {
    pub id: String,
    pub constraints: PathBuf,
    pub events: PathBuf,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read manifest {}: {e}", path.display()))?;
        let mut manifest: Manifest = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse manifest {}: {e}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for case in &mut manifest.cases {
            case.constraints = base.join(&case.constraints);
            case.events = base.join(&case.events);
        }
        Ok(manifest)
    }
}

/// Result of evaluating one case.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub id: String,
    pub result: Result<Verdict, String>,
}

impl CaseOutcome {
    pub fn label(&self) -> Option<u8> {
        self.result.as_ref().ok().map(Verdict::label)
    }
}

/// Evaluate every case concurrently.
pub async fn run_manifest(manifest: Manifest, config: EngineConfig) -> Vec<CaseOutcome> {
    let handles: Vec<_> = manifest
        .cases
        .into_iter()
        .map(|case| {
            let config = config.clone();
            let id = case.id.clone();
            let handle = tokio::task::spawn_blocking(move || evaluate_case(&case, config));
            (id, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(format!("evaluation task failed: {e}")),
        };
        match &result {
            Ok(verdict) => info!(case = %id, label = verdict.label(), "Case evaluated"),
            Err(reason) => warn!(case = %id, reason = %reason, "Case failed"),
        }
        outcomes.push(CaseOutcome { id, result });
    }
    outcomes
}

fn evaluate_case(case: &ManifestCase, config: EngineConfig) -> Result<Verdict, String> {
    let constraints = load_constraints(&case.constraints).map_err(|e| e.to_string())?;
    let events = load_events(&case.events).map_err(|e| e.to_string())?;
    ConsistencyEngine::new(constraints, config)
        .and_then(|engine| engine.evaluate(events))
        .map_err(|e| e.to_string())
}

/// Render `id,prediction` rows for the cases that produced a verdict.
pub fn to_csv(outcomes: &[CaseOutcome]) -> String {
    let mut out = String::from("id,prediction\n");
    for outcome in outcomes {
        if let Some(label) = outcome.label() {
            let _ = writeln!(out, "{},{label}", outcome.id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_paths_resolve_against_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.toml");
        std::fs::write(
            &path,
            "[[cases]]\nid = \"a\"\nconstraints = \"b/a.toml\"\nevents = \"n/a.jsonl\"\n",
        )
        .unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.cases.len(), 1);
        assert_eq!(manifest.cases[0].constraints, dir.path().join("b/a.toml"));
        assert_eq!(manifest.cases[0].events, dir.path().join("n/a.jsonl"));
    }

    #[test]
    fn csv_omits_failed_cases() {
        let outcomes = vec![
            CaseOutcome {
                id: "1".into(),
                result: Ok(loreguard_engine::decide(None, 0.0, 2.0)),
            },
            CaseOutcome {
                id: "2".into(),
                result: Err("missing file".into()),
            },
            CaseOutcome {
                id: "3".into(),
                result: Ok(loreguard_engine::decide(None, 5.0, 2.0)),
            },
        ];
        assert_eq!(to_csv(&outcomes), "id,prediction\n1,1\n3,0\n");
    }

    #[tokio::test]
    async fn missing_files_become_failed_outcomes() {
        let manifest = Manifest {
            cases: vec![ManifestCase {
                id: "ghost".into(),
                constraints: PathBuf::from("/nonexistent/backstory.toml"),
                events: PathBuf::from("/nonexistent/narrative.jsonl"),
            }],
        };
        let outcomes = run_manifest(manifest, EngineConfig::default()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[0].label(), None);
    }
}
