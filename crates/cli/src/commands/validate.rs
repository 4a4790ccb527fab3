//! `loreguard validate` — Build the registry and report what it holds.

use std::path::Path;

use loreguard::fixtures::load_constraints;
use loreguard_engine::ConsistencyEngine;

use super::load_config;

pub async fn run(
    constraints_path: &Path,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config validation failed: {e}");
            std::process::exit(1);
        }
    };
    let constraints = load_constraints(constraints_path)?;
    let total = constraints.len();

    let engine = match ConsistencyEngine::new(constraints, config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Backstory validation failed: {e}");
            std::process::exit(1);
        }
    };

    let registry = engine.registry();
    let vetoable = registry.constraints().filter(|c| c.is_veto_eligible()).count();
    println!("All {total} constraints are valid. {vetoable} can veto.\n");
    for (i, c) in registry.constraints().enumerate() {
        println!(
            "  {}. [{}] {} (subject: {}, action: {}, polarity: {:?}, reversibility: {:?})",
            i + 1,
            c.category,
            c.id,
            c.subject,
            c.scope.action,
            c.polarity,
            c.reversibility()
        );
        if !c.description.is_empty() {
            println!("     {}", c.description);
        }
        if !c.scope.condition.is_empty() {
            println!("     condition: {}", c.scope.condition);
        }
    }

    let config = engine.config();
    println!(
        "\nThreshold {} | exponent {} | damping {}",
        config.threshold, config.weighting_exponent, config.repeat_damping
    );
    Ok(())
}
