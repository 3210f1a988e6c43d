// src/ranking/mod.rs
//! Ranking engine: weighted four-component score per candidate, stable descending order.

pub mod scoring;
pub mod weights;

use metrics::histogram;
use serde::Serialize;

use crate::model::ContentItem;
use crate::profile::UserProfile;

pub use scoring::{score_item, ScoreBreakdown};
pub use weights::{round_dp, RankWeights};

/// Inputs besides the candidates and the profile.
#[derive(Clone, Copy, Debug)]
pub struct RankContext<'a> {
    pub recent_sources: &'a [String],
    pub weights: RankWeights,
    pub priority_category: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedItem {
    pub item: ContentItem,
    pub score: ScoreBreakdown,
}

/// Score every candidate and sort by total, highest first. Ties keep input order.
pub fn rank(candidates: Vec<ContentItem>, profile: &UserProfile, ctx: &RankContext<'_>) -> Vec<RankedItem> {
    let t0 = std::time::Instant::now();
    let mut ranked: Vec<RankedItem> = candidates
        .into_iter()
        .map(|item| {
            let score = score_item(
                &item,
                &profile.interest_tags,
                &profile.saved_items,
                ctx.recent_sources,
                ctx.priority_category,
                &ctx.weights,
            );
            RankedItem { item, score }
        })
        .collect();

    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));
    histogram!("rank_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    ranked
}
