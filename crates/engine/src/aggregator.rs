//! Soft-conflict aggregation.
//!
//! Evidence is kept per constraint and folded into per-category pressure
//! in `[0, 1]`:
//!
//! ```text
//! pressure = max + (1 - max) * (1 - Π (1 - damping * c_i))
//! ```
//!
//! where `c_i` are the weighted contributions of the admitted constraints
//! in that category. The maximum dominates; repeated smaller conflicts add
//! a sub-additive penalty that saturates instead of running away on long
//! narratives. Categories are then combined as a precedence-weighted sum.
//!
//! A constraint is admitted only if one of its conflicts lands at or after
//! the causal window, and unless its sole conflict is below the noise
//! floor. Both filters are decided at [`AggregateState::finalize`], so the
//! fold stays order-independent: `max`, the product, the count and the
//! causal flag are all commutative and associative.

use std::collections::BTreeMap;

use loreguard_config::{EngineConfig, PrecedenceTable};
use loreguard_core::{Category, WeightedConflict};

/// Running pressure state: for one constraint, or merged for a category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryPressure {
    /// Largest contribution observed.
    pub max: f64,
    /// Π (1 - damping * c_i) over observed contributions.
    pub survival: f64,
    pub count: usize,
}

impl Default for CategoryPressure {
    fn default() -> Self {
        Self {
            max: 0.0,
            survival: 1.0,
            count: 0,
        }
    }
}

impl CategoryPressure {
    fn observe(&mut self, contribution: f64, damping: f64) {
        let c = contribution.clamp(0.0, 1.0);
        self.max = self.max.max(c);
        self.survival *= 1.0 - damping * c;
        self.count += 1;
    }

    fn merge(&mut self, other: &CategoryPressure) {
        self.max = self.max.max(other.max);
        self.survival *= other.survival;
        self.count += other.count;
    }

    /// Pressure in `[0, 1]`.
    pub fn value(&self) -> f64 {
        (self.max + (1.0 - self.max) * (1.0 - self.survival)).clamp(0.0, 1.0)
    }
}

/// Evidence gathered against one constraint.
#[derive(Debug, Clone, PartialEq)]
struct Evidence {
    category: Category,
    pressure: CategoryPressure,
    causal: bool,
}

/// Fold accumulator for soft conflicts across the whole narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState {
    precedence: PrecedenceTable,
    damping: f64,
    causal_window: f64,
    noise_floor: f64,
    evidence: BTreeMap<String, Evidence>,
}

impl AggregateState {
    /// A state with no evidence filters.
    pub fn new(precedence: PrecedenceTable, damping: f64) -> Self {
        Self {
            precedence,
            damping,
            causal_window: 0.0,
            noise_floor: 0.0,
            evidence: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.precedence.clone(), config.repeat_damping)
            .with_causal_window(config.causal_window)
            .with_noise_floor(config.noise_floor)
    }

    pub fn with_causal_window(mut self, causal_window: f64) -> Self {
        self.causal_window = causal_window;
        self
    }

    pub fn with_noise_floor(mut self, noise_floor: f64) -> Self {
        self.noise_floor = noise_floor;
        self
    }

    /// Fold one weighted conflict into the state.
    pub fn accumulate(mut self, conflict: &WeightedConflict) -> Self {
        self.accumulate_in_place(conflict);
        self
    }

    pub(crate) fn accumulate_in_place(&mut self, conflict: &WeightedConflict) {
        let causal = conflict.position >= self.causal_window;
        let entry = self
            .evidence
            .entry(conflict.conflict.constraint_id.clone())
            .or_insert_with(|| Evidence {
                category: conflict.conflict.category,
                pressure: CategoryPressure::default(),
                causal: false,
            });
        entry.pressure.observe(conflict.contribution, self.damping);
        entry.causal |= causal;
    }

    /// Combine two partial states built under the same policy.
    pub fn merge(mut self, other: &AggregateState) -> Self {
        for (id, theirs) in &other.evidence {
            match self.evidence.get_mut(id) {
                Some(ours) => {
                    ours.pressure.merge(&theirs.pressure);
                    ours.causal |= theirs.causal;
                }
                None => {
                    self.evidence.insert(id.clone(), theirs.clone());
                }
            }
        }
        self
    }

    /// Whether a constraint's evidence survives the causal window and noise floor.
    fn admits(&self, evidence: &Evidence) -> bool {
        let lone_noise =
            evidence.pressure.count == 1 && evidence.pressure.max < self.noise_floor;
        evidence.causal && !lone_noise
    }

    fn categories(&self) -> BTreeMap<Category, CategoryPressure> {
        let mut categories: BTreeMap<Category, CategoryPressure> = BTreeMap::new();
        for evidence in self.evidence.values().filter(|e| self.admits(e)) {
            categories
                .entry(evidence.category)
                .or_default()
                .merge(&evidence.pressure);
        }
        categories
    }

    /// Per-category pressure before precedence scaling, in category order.
    ///
    /// Categories whose constraints were all filtered out are absent.
    pub fn category_pressures(&self) -> BTreeMap<Category, f64> {
        self.categories()
            .into_iter()
            .map(|(category, pressure)| (category, pressure.value()))
            .collect()
    }

    /// Precedence-weighted aggregate pressure. `0.0` when nothing counted.
    pub fn finalize(&self) -> f64 {
        self.categories()
            .iter()
            .map(|(category, pressure)| self.precedence.get(*category) * pressure.value())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }
}
