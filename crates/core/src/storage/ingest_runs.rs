use crate::ingest::IngestSummary;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub async fn record_ingest_run(
    pool: &sqlx::PgPool,
    started_at: DateTime<Utc>,
    summary: &IngestSummary,
    error: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let finished_at: DateTime<Utc> = Utc::now();
    let status = if error.is_some() { "error" } else { "success" };

    sqlx::query(
        "INSERT INTO ingest_runs (id, started_at, finished_at, status, error, pages, inserted, skipped) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .persistent(false)
    .bind(id)
    .bind(started_at)
    .bind(finished_at)
    .bind(status)
    .bind(error)
    .bind(summary.pages as i32)
    .bind(summary.inserted as i32)
    .bind(summary.skipped as i32)
    .execute(pool)
    .await
    .context("insert ingest_runs failed")?;

    Ok(id)
}
