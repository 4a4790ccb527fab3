//! `loreguard batch` — Evaluate every case in a manifest.

use std::path::Path;

use loreguard::batch::{Manifest, run_manifest, to_csv};

use super::load_config;

pub async fn run(
    manifest_path: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let manifest = Manifest::load(manifest_path).map_err(|e| e.to_string())?;
    let total = manifest.cases.len();

    let outcomes = run_manifest(manifest, config).await;
    let csv = to_csv(&outcomes);
    match output {
        Some(path) => {
            std::fs::write(path, &csv)?;
            eprintln!("Wrote {} predictions to {}", total, path.display());
        }
        None => print!("{csv}"),
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    if !failed.is_empty() {
        for outcome in &failed {
            if let Err(reason) = &outcome.result {
                eprintln!("  case {}: {reason}", outcome.id);
            }
        }
        return Err(format!("{} of {total} cases failed", failed.len()).into());
    }
    Ok(())
}
