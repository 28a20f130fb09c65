pub mod scale;

use crate::domain::recommendation::{PricedRating, RankedCandidate};
use std::collections::BTreeMap;

pub const UPSIDE_WEIGHT: f64 = 0.7;
pub const RATING_DELTA_WEIGHT: f64 = 0.3;
pub const TOP_N: usize = 10;

/// Scores one rating. Returns `None` when the price cannot anchor an upside (zero or not finite).
pub fn score(rating: PricedRating) -> Option<RankedCandidate> {
    let price = rating.current_price;
    if price == 0.0 || !price.is_finite() {
        return None;
    }

    let avg_target = (rating.target_from + rating.target_to) / 2.0;
    let upside_pct = (avg_target - price) / price;
    let delta = scale::rating_delta(&rating.rating_from, &rating.rating_to) as f64;
    let composite = UPSIDE_WEIGHT * upside_pct + RATING_DELTA_WEIGHT * delta;
    if !composite.is_finite() {
        return None;
    }

    Some(RankedCandidate {
        ticker: rating.ticker,
        company: rating.company,
        brokerage: rating.brokerage,
        rating_from: rating.rating_from,
        rating_to: rating.rating_to,
        target_from: rating.target_from,
        target_to: rating.target_to,
        current_price: price,
        upside_pct,
        composite,
    })
}

/// Keeps one rating per ticker: the latest by time, then by row id.
pub fn latest_per_ticker(ratings: Vec<PricedRating>) -> Vec<PricedRating> {
    let mut latest: BTreeMap<String, PricedRating> = BTreeMap::new();
    for rating in ratings {
        let newer = latest
            .get(&rating.ticker)
            .map_or(true, |kept| (rating.time, rating.id) > (kept.time, kept.id));
        if newer {
            latest.insert(rating.ticker.clone(), rating);
        }
    }
    latest.into_values().collect()
}

/// Ranks ratings by composite score (descending, ties by ticker) and keeps the first `top_n`.
pub fn rank(ratings: Vec<PricedRating>, top_n: usize) -> Vec<RankedCandidate> {
    let mut scored: Vec<RankedCandidate> = latest_per_ticker(ratings)
        .into_iter()
        .filter_map(score)
        .collect();

    scored.sort_by(|a, b| {
        b.composite
            .partial_cmp(&a.composite)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    scored.truncate(top_n);
    scored
}
