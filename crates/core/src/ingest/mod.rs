pub mod feed;
pub mod price;

use crate::domain::rating::NewRatingChange;
use feed::RatingsFeedClient;
use price::PriceProvider;

#[async_trait::async_trait]
pub trait RatingChangeSink: Send + Sync {
    async fn insert(&self, rating: &NewRatingChange) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl RatingChangeSink for sqlx::PgPool {
    async fn insert(&self, rating: &NewRatingChange) -> anyhow::Result<()> {
        crate::storage::ratings::insert_rating_change(self, rating).await
    }
}

/// Validates and logs ratings without writing them.
#[derive(Debug, Default)]
pub struct DryRunSink;

#[async_trait::async_trait]
impl RatingChangeSink for DryRunSink {
    async fn insert(&self, rating: &NewRatingChange) -> anyhow::Result<()> {
        tracing::debug!(ticker = %rating.ticker, time = %rating.time, "dry-run: would insert rating change");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub pages: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub unpriced: usize,
}

/// Pages through the feed until it runs dry, storing every item that validates.
///
/// Bad items and failed inserts are counted as skipped; a feed failure ends the run with an error.
/// `summary` reflects the work done even when an error is returned.
pub async fn run_ingest(
    feed: &dyn RatingsFeedClient,
    prices: &dyn PriceProvider,
    sink: &dyn RatingChangeSink,
    opts: &IngestOptions,
    summary: &mut IngestSummary,
) -> anyhow::Result<()> {
    let mut next_page: Option<String> = None;

    loop {
        if opts.max_pages.is_some_and(|max| summary.pages >= max) {
            tracing::info!(pages = summary.pages, "max pages reached; stopping ingest");
            break;
        }

        let page = feed.fetch_page(next_page.as_deref()).await?;
        summary.pages += 1;

        if page.items.is_empty() {
            break;
        }

        tracing::debug!(
            page = summary.pages,
            items = page.items.len(),
            feed = feed.feed_name(),
            "fetched ratings feed page"
        );

        let next_key = page.next_page_key().map(str::to_string);
        for item in page.items {
            let ticker = item.ticker.clone();

            let mut rating = match item.validate_and_into_new(None) {
                Ok(rating) => rating,
                Err(e) => {
                    tracing::warn!(%ticker, error = %format!("{e:#}"), "skipping invalid feed item");
                    summary.skipped += 1;
                    continue;
                }
            };

            rating.current_price = match prices.current_price(&rating.ticker).await {
                Ok(price) if price.is_finite() => Some(price),
                Ok(price) => {
                    tracing::warn!(%ticker, price, "ignoring non-finite current price");
                    summary.unpriced += 1;
                    None
                }
                Err(e) => {
                    tracing::warn!(%ticker, error = %e, "current price unavailable");
                    summary.unpriced += 1;
                    None
                }
            };

            match sink.insert(&rating).await {
                Ok(()) => summary.inserted += 1,
                Err(e) => {
                    tracing::warn!(%ticker, error = %format!("{e:#}"), "failed to store rating change");
                    summary.skipped += 1;
                }
            }
        }

        match next_key {
            Some(key) => next_page = Some(key),
            None => break,
        }
    }

    Ok(())
}
