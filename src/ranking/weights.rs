//! Ranking weight vectors per learning phase.
//!
//! Stable (and cold start) ranks with [`RankWeights::BASE`]. The quick-learning window pins
//! diversity to a configured value and splits the rest over interest, knowledge and
//! popularity in their base proportions; popularity absorbs the rounding remainder.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankWeights {
    pub interest: f64,
    pub knowledge: f64,
    pub diversity: f64,
    pub popularity: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self::BASE
    }
}

impl RankWeights {
    pub const BASE: RankWeights = RankWeights {
        interest: 0.4,
        knowledge: 0.3,
        diversity: 0.2,
        popularity: 0.1,
    };

    /// Quick-phase vector with diversity pinned to `diversity` (clamped into [0,1]).
    pub fn quick(diversity: f64) -> Self {
        let base = Self::BASE;
        let diversity = if diversity.is_finite() { diversity.clamp(0.0, 1.0) } else { base.diversity };
        let remaining = (1.0 - diversity).max(0.0);
        let ratio_total = base.interest + base.knowledge + base.popularity;

        let interest = round_dp(remaining * (base.interest / ratio_total), 4);
        let knowledge = round_dp(remaining * (base.knowledge / ratio_total), 4);
        let popularity = round_dp((1.0 - diversity - interest - knowledge).max(0.0), 4);
        Self {
            interest,
            knowledge,
            diversity: round_dp(diversity, 4),
            popularity,
        }
    }

    pub fn sum(&self) -> f64 {
        self.interest + self.knowledge + self.diversity + self.popularity
    }
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(x: f64, dp: i32) -> f64 {
    let m = 10f64.powi(dp);
    (x * m).round() / m
}
