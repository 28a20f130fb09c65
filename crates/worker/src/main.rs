use anyhow::Context;
use clap::Parser;
use ratings_core::ingest::feed::{HttpRatingsFeed, RatingsFeedClient};
use ratings_core::ingest::price::ChartPriceProvider;
use ratings_core::ingest::{DryRunSink, IngestOptions, IngestSummary};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ratings_worker")]
struct Args {
    /// Fetch and validate the feed without writing to the database.
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many feed pages.
    #[arg(long)]
    max_pages: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = ratings_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let opts = IngestOptions {
        max_pages: args.max_pages,
    };

    let feed = HttpRatingsFeed::from_settings(&settings)?;
    let prices = ChartPriceProvider::from_settings(&settings)?;
    let started_at = chrono::Utc::now();
    let mut summary = IngestSummary::default();

    if args.dry_run {
        ratings_core::ingest::run_ingest(&feed, &prices, &DryRunSink, &opts, &mut summary).await?;
        tracing::info!(
            dry_run = true,
            pages = summary.pages,
            valid = summary.inserted,
            skipped = summary.skipped,
            unpriced = summary.unpriced,
            "ingest finished (dry-run)"
        );
        return Ok(());
    }

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    ratings_core::storage::migrate(&pool).await?;

    tracing::info!(feed = feed.feed_name(), "starting ingest");
    let result = ratings_core::ingest::run_ingest(&feed, &prices, &pool, &opts, &mut summary).await;

    match result {
        Ok(()) => {
            let run_id = ratings_core::storage::ingest_runs::record_ingest_run(
                &pool,
                started_at,
                &summary,
                None,
            )
            .await?;

            tracing::info!(
                %run_id,
                pages = summary.pages,
                inserted = summary.inserted,
                skipped = summary.skipped,
                unpriced = summary.unpriced,
                "ingest finished"
            );
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            let run_id = ratings_core::storage::ingest_runs::record_ingest_run(
                &pool,
                started_at,
                &summary,
                Some(&format!("{:#}", err)),
            )
            .await?;

            tracing::error!(
                %run_id,
                pages = summary.pages,
                inserted = summary.inserted,
                error = %err,
                "ingest run failed"
            );
        }
    }

    Ok(())
}

fn init_sentry(settings: &ratings_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
