use crate::domain::rating::{
    format_time, join_sub_micros, split_sub_micros, NewRatingChange, RatingChangeRecord,
};
use crate::domain::recommendation::PricedRating;
use crate::query::ListQuery;
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone, sqlx::FromRow)]
struct RatingChangeRow {
    ticker: String,
    company: String,
    brokerage: String,
    action: String,
    rating_from: String,
    rating_to: String,
    target_from: Option<String>,
    target_to: Option<String>,
    time: DateTime<Utc>,
    time_nanos: i32,
}

impl From<RatingChangeRow> for RatingChangeRecord {
    fn from(row: RatingChangeRow) -> Self {
        Self {
            ticker: row.ticker,
            company: row.company,
            brokerage: row.brokerage,
            action: row.action,
            rating_from: row.rating_from,
            rating_to: row.rating_to,
            target_from: row.target_from.unwrap_or_default(),
            target_to: row.target_to.unwrap_or_default(),
            time: format_time(&join_sub_micros(row.time, row.time_nanos)),
        }
    }
}

pub async fn insert_rating_change(
    pool: &sqlx::PgPool,
    rating: &NewRatingChange,
) -> anyhow::Result<()> {
    let (time, time_nanos) = split_sub_micros(&rating.time);
    sqlx::query(
        "INSERT INTO rating_changes (ticker, company, brokerage, action, rating_from, rating_to, \
         target_from, target_to, time, time_nanos, current_price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&rating.ticker)
    .bind(&rating.company)
    .bind(&rating.brokerage)
    .bind(&rating.action)
    .bind(&rating.rating_from)
    .bind(&rating.rating_to)
    .bind(rating.target_from)
    .bind(rating.target_to)
    .bind(time)
    .bind(time_nanos)
    .bind(rating.current_price)
    .execute(pool)
    .await
    .with_context(|| format!("insert rating_changes failed (ticker={})", rating.ticker))?;

    Ok(())
}

pub async fn list_rating_changes(
    pool: &sqlx::PgPool,
    query: &ListQuery,
) -> anyhow::Result<Vec<RatingChangeRecord>> {
    let mut qb = query.to_query_builder();
    let rows = qb
        .build_query_as::<RatingChangeRow>()
        .persistent(false)
        .fetch_all(pool)
        .await
        .context("select rating_changes failed")?;

    Ok(rows.into_iter().map(RatingChangeRecord::from).collect())
}

pub async fn latest_for_ticker(
    pool: &sqlx::PgPool,
    ticker: &str,
) -> anyhow::Result<Option<RatingChangeRecord>> {
    let row = sqlx::query_as::<_, RatingChangeRow>(
        "SELECT ticker, company, brokerage, action, rating_from, rating_to, \
         target_from::TEXT AS target_from, target_to::TEXT AS target_to, time, time_nanos \
         FROM rating_changes \
         WHERE ticker = $1 \
         ORDER BY time DESC, time_nanos DESC, id DESC \
         LIMIT 1",
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("select latest rating_changes failed (ticker={ticker})"))?;

    Ok(row.map(RatingChangeRecord::from))
}

/// Latest rating per ticker that has both targets and a nonzero price.
///
/// Rows that fail to decode are logged and skipped.
pub async fn latest_priced_ratings(pool: &sqlx::PgPool) -> anyhow::Result<Vec<PricedRating>> {
    let rows = sqlx::query(
        "SELECT DISTINCT ON (ticker) \
             id, ticker, company, brokerage, rating_from, rating_to, \
             target_from::FLOAT8 AS target_from, target_to::FLOAT8 AS target_to, \
             current_price, time, time_nanos \
         FROM rating_changes \
         WHERE target_from IS NOT NULL AND target_to IS NOT NULL \
           AND current_price IS NOT NULL AND current_price <> 0 \
         ORDER BY ticker, time DESC, time_nanos DESC, id DESC",
    )
    .fetch_all(pool)
    .await
    .context("select latest priced rating_changes failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match decode_priced_rating(&row) {
            Ok(rating) => out.push(rating),
            Err(e) => tracing::warn!(error = %e, "skipping undecodable rating_changes row"),
        }
    }
    Ok(out)
}

fn decode_priced_rating(row: &sqlx::postgres::PgRow) -> Result<PricedRating, sqlx::Error> {
    Ok(PricedRating {
        id: row.try_get("id")?,
        ticker: row.try_get("ticker")?,
        company: row.try_get("company")?,
        brokerage: row.try_get("brokerage")?,
        rating_from: row.try_get("rating_from")?,
        rating_to: row.try_get("rating_to")?,
        target_from: row.try_get("target_from")?,
        target_to: row.try_get("target_to")?,
        current_price: row.try_get("current_price")?,
        time: join_sub_micros(row.try_get("time")?, row.try_get("time_nanos")?),
    })
}
