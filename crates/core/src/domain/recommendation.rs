use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest rating change for a ticker with both targets and a nonzero price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRating {
    pub id: i64,
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub rating_from: String,
    pub rating_to: String,
    pub target_from: f64,
    pub target_to: f64,
    pub current_price: f64,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub rating_from: String,
    pub rating_to: String,
    pub target_from: f64,
    pub target_to: f64,
    pub current_price: f64,
    pub upside_pct: f64,
    pub composite: f64,
}
