//! Veto engine.
//!
//! A hard conflict (voluntary violation of an irreversible constraint)
//! disqualifies the backstory outright. The first one found in narrative
//! order is recorded; nothing after it is examined.
//!
//! ```text
//! Scanning ──hard conflict──▶ Vetoed            (terminal)
//!    │
//!    └──input exhausted────▶ PendingAggregation (terminal, feeds the aggregator)
//! ```

use loreguard_core::{Conflict, Veto};
use tracing::warn;

/// Pure filter: a veto if and only if the conflict is hard.
pub fn check(conflict: &Conflict) -> Option<Veto> {
    conflict.is_hard().then(|| Veto {
        constraint_id: conflict.constraint_id.clone(),
        event_id: conflict.event_id,
    })
}

/// Veto state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VetoState {
    #[default]
    Scanning,
    Vetoed(Veto),
    PendingAggregation,
}

impl VetoState {
    /// Feed one conflict. Only a `Scanning` state can transition.
    pub fn observe(self, conflict: &Conflict) -> Self {
        match self {
            VetoState::Scanning => match check(conflict) {
                Some(veto) => {
                    warn!(
                        constraint = %veto.constraint_id,
                        index = veto.event_id,
                        "Hard violation: backstory vetoed"
                    );
                    VetoState::Vetoed(veto)
                }
                None => VetoState::Scanning,
            },
            terminal => terminal,
        }
    }

    /// Input exhausted without a veto.
    pub fn finish(self) -> Self {
        match self {
            VetoState::Scanning => VetoState::PendingAggregation,
            terminal => terminal,
        }
    }

    pub fn is_vetoed(&self) -> bool {
        matches!(self, VetoState::Vetoed(_))
    }

    pub fn veto(&self) -> Option<&Veto> {
        match self {
            VetoState::Vetoed(veto) => Some(veto),
            _ => None,
        }
    }

    pub fn into_veto(self) -> Option<Veto> {
        match self {
            VetoState::Vetoed(veto) => Some(veto),
            _ => None,
        }
    }
}
