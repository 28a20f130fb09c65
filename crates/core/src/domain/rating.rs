use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A validated rating change as written by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRatingChange {
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub action: String,
    pub rating_from: String,
    pub rating_to: String,
    pub target_from: Option<f64>,
    pub target_to: Option<f64>,
    pub time: DateTime<Utc>,
    pub current_price: Option<f64>,
}

/// A stored rating change as served by the listing and lookup endpoints.
///
/// Price targets keep the store's decimal text (`"10.50"`); a missing target is `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChangeRecord {
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub action: String,
    pub rating_from: String,
    pub rating_to: String,
    pub target_from: String,
    pub target_to: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingChangeList {
    pub items: Vec<RatingChangeRecord>,
}

/// RFC 3339 with exactly nine fractional digits and a `Z` suffix.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Splits `time` into the microsecond-precision instant PostgreSQL can hold and the
/// nanoseconds (0..=999) below it.
pub fn split_sub_micros(time: &DateTime<Utc>) -> (DateTime<Utc>, i32) {
    let nanos = (time.timestamp_subsec_nanos() % 1_000) as i32;
    (*time - Duration::nanoseconds(i64::from(nanos)), nanos)
}

/// Inverse of [`split_sub_micros`].
pub fn join_sub_micros(micros: DateTime<Utc>, nanos: i32) -> DateTime<Utc> {
    micros + Duration::nanoseconds(i64::from(nanos))
}
