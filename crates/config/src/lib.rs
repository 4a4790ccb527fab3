//! Engine policy configuration: loading, validation, and defaults.
//!
//! Loads configuration from `~/.loreguard/config.toml` with environment
//! variable overrides. Every weight the engine applies is declared here;
//! nothing is learned. Values are validated before any event is processed.

use loreguard_core::Category;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.loreguard/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Exponent applied to the normalized narrative position.
    /// Values above 1 concentrate weight toward the end of the story.
    #[serde(default = "default_weighting_exponent")]
    pub weighting_exponent: f64,

    /// Floor for temporal weights, so no event has zero evidentiary value.
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    /// Aggregate pressure at or above which the backstory is inconsistent.
    ///
    /// Pressure is the precedence-weighted sum of category pressures, each
    /// in [0, 1], so with the default table it ranges over [0, 15]. The
    /// default of 2.0 lets a single late identity or commitment conflict
    /// decide, while a fear conflict alone never can.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Scale applied to each conflict when accumulating repeated tension
    /// inside one category.
    #[serde(default = "default_repeat_damping")]
    pub repeat_damping: f64,

    /// Multiplier on soft contributions from coerced events.
    #[serde(default = "default_coercion_discount")]
    pub coercion_discount: f64,

    /// Multiplier on soft contributions from justified events.
    #[serde(default = "default_justification_discount")]
    pub justification_discount: f64,

    /// Opening fraction of the narrative in which conflicts alone cannot
    /// count: a constraint contributes pressure only once one of its soft
    /// conflicts lands at or after this position. `0.0` disables the window.
    #[serde(default = "default_causal_window")]
    pub causal_window: f64,

    /// A constraint with exactly one soft conflict whose contribution is
    /// below this floor contributes nothing. `0.0` disables the floor.
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,

    /// What to do with events missing required fields.
    #[serde(default)]
    pub malformed_events: MalformedEventPolicy,

    /// Which position drives temporal weighting.
    #[serde(default)]
    pub temporal_basis: TemporalBasis,

    /// Per-category precedence used as a multiplicative pressure factor.
    #[serde(default)]
    pub precedence: PrecedenceTable,
}

fn default_weighting_exponent() -> f64 {
    2.0
}
fn default_min_weight() -> f64 {
    0.01
}
fn default_threshold() -> f64 {
    2.0
}
fn default_repeat_damping() -> f64 {
    0.5
}
fn default_coercion_discount() -> f64 {
    0.4
}
fn default_justification_discount() -> f64 {
    0.6
}
fn default_causal_window() -> f64 {
    0.1
}
fn default_noise_floor() -> f64 {
    0.05
}

/// Handling of events that lack `actor`, `action` or `sequence_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedEventPolicy {
    /// Record the event as skipped and keep evaluating.
    #[default]
    Skip,
    /// Fail the whole evaluation.
    Abort,
}

/// Source of an event's position for temporal weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalBasis {
    /// `sequence_index / narrative_length`.
    #[default]
    Sequence,
    /// The event's `narrative_time` when present, else the sequence position.
    NarrativeTime,
}

/// Precedence per constraint category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedenceTable {
    #[serde(default = "default_belief")]
    pub belief: f64,
    #[serde(default = "default_commitment")]
    pub commitment: f64,
    #[serde(default = "default_fear")]
    pub fear: f64,
    #[serde(default = "default_capability")]
    pub capability: f64,
    #[serde(default = "default_identity_trait")]
    pub identity_trait: f64,
}

fn default_belief() -> f64 {
    2.0
}
fn default_commitment() -> f64 {
    5.0
}
fn default_fear() -> f64 {
    1.0
}
fn default_capability() -> f64 {
    3.0
}
fn default_identity_trait() -> f64 {
    4.0
}

impl PrecedenceTable {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Belief => self.belief,
            Category::Commitment => self.commitment,
            Category::Fear => self.fear,
            Category::Capability => self.capability,
            Category::IdentityTrait => self.identity_trait,
        }
    }

    pub fn set(&mut self, category: Category, precedence: f64) {
        let slot = match category {
            Category::Belief => &mut self.belief,
            Category::Commitment => &mut self.commitment,
            Category::Fear => &mut self.fear,
            Category::Capability => &mut self.capability,
            Category::IdentityTrait => &mut self.identity_trait,
        };
        *slot = precedence;
    }
}

impl Default for PrecedenceTable {
    fn default() -> Self {
        Self {
            belief: default_belief(),
            commitment: default_commitment(),
            fear: default_fear(),
            capability: default_capability(),
            identity_trait: default_identity_trait(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weighting_exponent: default_weighting_exponent(),
            min_weight: default_min_weight(),
            threshold: default_threshold(),
            repeat_damping: default_repeat_damping(),
            coercion_discount: default_coercion_discount(),
            justification_discount: default_justification_discount(),
            causal_window: default_causal_window(),
            noise_floor: default_noise_floor(),
            malformed_events: MalformedEventPolicy::default(),
            temporal_basis: TemporalBasis::default(),
            precedence: PrecedenceTable::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (~/.loreguard/config.toml).
    ///
    /// Also checks environment variables:
    /// - `LOREGUARD_THRESHOLD`
    /// - `LOREGUARD_WEIGHTING_EXPONENT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::info!(path = %path.display(), "Engine config loaded");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LOREGUARD_*` overrides using the given variable lookup, then
    /// re-validate.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("LOREGUARD_THRESHOLD") {
            self.threshold = parse_override("LOREGUARD_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("LOREGUARD_WEIGHTING_EXPONENT") {
            self.weighting_exponent = parse_override("LOREGUARD_WEIGHTING_EXPONENT", &raw)?;
        }
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loreguard")
    }

    /// Validate every value against its declared domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.weighting_exponent.is_finite() && self.weighting_exponent > 0.0) {
            return Err(ConfigError::invalid(
                "weighting_exponent",
                "must be a finite number > 0",
            ));
        }
        unit_interval("min_weight", self.min_weight)?;
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::invalid("threshold", "must be a finite number > 0"));
        }
        unit_interval("repeat_damping", self.repeat_damping)?;
        unit_interval("coercion_discount", self.coercion_discount)?;
        unit_interval("justification_discount", self.justification_discount)?;
        if !(self.causal_window.is_finite() && (0.0..1.0).contains(&self.causal_window)) {
            return Err(ConfigError::invalid("causal_window", "must be in [0, 1)"));
        }
        if !(self.noise_floor.is_finite() && (0.0..=1.0).contains(&self.noise_floor)) {
            return Err(ConfigError::invalid("noise_floor", "must be in [0, 1]"));
        }

        for category in Category::ALL {
            let p = self.precedence.get(category);
            if !p.is_finite() || p < 0.0 {
                return Err(ConfigError::InvalidConfig {
                    field: format!("precedence.{category}"),
                    reason: "must be a finite, non-negative number".into(),
                });
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Values that must lie in (0, 1].
fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be in (0, 1]"))
    }
}

fn parse_override(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::invalid(key, &format!("not a number: {raw}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for loreguard_core::Error {
    fn from(err: ConfigError) -> Self {
        loreguard_core::Error::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weighting_exponent, 2.0);
        assert_eq!(config.threshold, 2.0);
        assert_eq!(config.malformed_events, MalformedEventPolicy::Skip);
        assert!(config.precedence.identity_trait > config.precedence.fear);
        assert_eq!(config.causal_window, 0.1);
        assert_eq!(config.noise_floor, 0.05);
    }

    #[test]
    fn evidence_filters_can_be_disabled() {
        let config = EngineConfig::from_toml("causal_window = 0.0\nnoise_floor = 0.0\n").unwrap();
        assert_eq!(config.causal_window, 0.0);
        assert_eq!(config.noise_floor, 0.0);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
threshold = 3.5
malformed_events = "abort"

[precedence]
fear = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.threshold, 3.5);
        assert_eq!(config.malformed_events, MalformedEventPolicy::Abort);
        assert_eq!(config.precedence.fear, 0.5);
        assert_eq!(config.precedence.commitment, 5.0);
        assert_eq!(config.weighting_exponent, 2.0);
    }

    #[test]
    fn negative_precedence_rejected() {
        let err = EngineConfig::from_toml("[precedence]\nbelief = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("precedence.belief"));
    }

    #[test]
    fn out_of_domain_values_rejected() {
        let cases = [
            EngineConfig {
                weighting_exponent: 0.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                min_weight: 0.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                threshold: f64::INFINITY,
                ..EngineConfig::default()
            },
            EngineConfig {
                repeat_damping: 1.5,
                ..EngineConfig::default()
            },
            EngineConfig {
                coercion_discount: -0.1,
                ..EngineConfig::default()
            },
            EngineConfig {
                causal_window: 1.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                noise_floor: -0.5,
                ..EngineConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = EngineConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "weighting_exponent = 3.0\ntemporal_basis = \"narrative_time\"\n")
            .unwrap();
        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.weighting_exponent, 3.0);
        assert_eq!(config.temporal_basis, TemporalBasis::NarrativeTime);
    }

    #[test]
    fn unparsable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "threshold = [").unwrap();
        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_overrides_apply_and_validate() {
        let vars: HashMap<&str, &str> = [
            ("LOREGUARD_THRESHOLD", "1.25"),
            ("LOREGUARD_WEIGHTING_EXPONENT", "3"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.threshold, 1.25);
        assert_eq!(config.weighting_exponent, 3.0);

        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|k| (k == "LOREGUARD_THRESHOLD").then(|| "-4".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));

        let mut config = EngineConfig::default();
        assert!(
            config
                .apply_overrides(|k| (k == "LOREGUARD_THRESHOLD").then(|| "high".to_string()))
                .is_err()
        );
    }

    #[test]
    fn config_error_converts_to_invalid_config() {
        let err: loreguard_core::Error = ConfigError::invalid("threshold", "bad").into();
        assert!(matches!(err, loreguard_core::Error::InvalidConfig(_)));
    }

    #[test]
    fn precedence_table_get_set() {
        let mut table = PrecedenceTable::default();
        table.set(Category::Fear, 7.0);
        assert_eq!(table.get(Category::Fear), 7.0);
        assert_eq!(table.get(Category::Belief), 2.0);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = EngineConfig::default_toml();
        assert!(toml_str.contains("weighting_exponent"));
        assert!(toml_str.contains("[precedence]"));
    }
}
