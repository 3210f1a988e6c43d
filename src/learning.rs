//! learning.rs: per-user learning phase and the weight vector it implies.
//!
//! cold_start → quick (bounded exploration window) → stable. Quick views periodically
//! decay interest tags so an early burst of feedback does not dominate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ranking::{round_dp, RankWeights};

/// Quick-phase views between two interest decays.
pub const REBALANCE_INTERVAL: u32 = 5;
pub const DECAY_FACTOR: f64 = 0.95;
/// Decayed tags with a smaller magnitude are dropped.
pub const KEEP_THRESHOLD: f64 = 0.15;
pub const DEFAULT_QUICK_LIMIT: u32 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    ColdStart,
    Quick,
    Stable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub interaction_count: u32,
    #[serde(default = "default_quick_limit")]
    pub quick_limit: u32,
    #[serde(default)]
    pub last_rebalanced_at: u32,
}

fn default_quick_limit() -> u32 {
    DEFAULT_QUICK_LIMIT
}

impl Default for LearningState {
    fn default() -> Self {
        Self {
            phase: Phase::ColdStart,
            interaction_count: 0,
            quick_limit: DEFAULT_QUICK_LIMIT,
            last_rebalanced_at: 0,
        }
    }
}

/// What one recommendation view did to the learning state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewOutcome {
    /// Not in the quick window; nothing tracked.
    Idle,
    Learning { count: u32, limit: u32, rebalanced: bool },
    /// Reached the limit on this view; phase is now stable.
    Graduated { count: u32, rebalanced: bool },
}

impl ViewOutcome {
    pub fn rebalanced(&self) -> bool {
        matches!(
            self,
            ViewOutcome::Learning { rebalanced: true, .. } | ViewOutcome::Graduated { rebalanced: true, .. }
        )
    }
}

impl LearningState {
    /// Enter the quick window from scratch.
    pub fn activate_quick(&mut self, limit: u32) {
        self.phase = Phase::Quick;
        self.interaction_count = 0;
        self.quick_limit = limit.max(1);
        self.last_rebalanced_at = 0;
    }

    pub fn weights(&self, quick_diversity: f64) -> RankWeights {
        match self.phase {
            Phase::Quick => RankWeights::quick(quick_diversity),
            Phase::ColdStart | Phase::Stable => RankWeights::BASE,
        }
    }

    /// Count one ranked view. Decays `interests` at each new stride boundary and graduates
    /// to stable once the limit is reached.
    pub fn record_view(&mut self, interests: &mut BTreeMap<String, f64>) -> ViewOutcome {
        if self.phase != Phase::Quick {
            return ViewOutcome::Idle;
        }
        self.interaction_count = self.interaction_count.saturating_add(1);
        let count = self.interaction_count;

        let rebalanced = count % REBALANCE_INTERVAL == 0 && count > self.last_rebalanced_at;
        if rebalanced {
            rebalance_interests(interests);
            self.last_rebalanced_at = count;
        }

        if count >= self.quick_limit {
            self.phase = Phase::Stable;
            ViewOutcome::Graduated { count, rebalanced }
        } else {
            ViewOutcome::Learning {
                count,
                limit: self.quick_limit,
                rebalanced,
            }
        }
    }
}

/// Multiply every affinity by [`DECAY_FACTOR`] (3 places) and drop the near-zero ones.
pub fn rebalance_interests(interests: &mut BTreeMap<String, f64>) {
    interests.retain(|_, v| {
        *v = round_dp(*v * DECAY_FACTOR, 3);
        v.abs() >= KEEP_THRESHOLD
    });
}
