use axum::{
    extract::{Path, Query, State},
    http::{header, Method},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratings_core::domain::rating::{RatingChangeList, RatingChangeRecord};
use ratings_core::domain::recommendation::RankedCandidate;
use ratings_core::query::{FilterSpec, ListParams, ListQuery};
use ratings_core::{ranking, storage};

mod error;

use error::ApiError;

const DEFAULT_PORT: u16 = 8081;

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
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { pool });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/stocks", get(list_stocks))
        .route("/stocks/:ticker", get(get_stock))
        .route("/recommend", get(recommend))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
}

impl AppState {
    fn pool(&self) -> Result<&PgPool, ApiError> {
        self.pool.as_ref().ok_or(ApiError::Unavailable)
    }
}

async fn list_stocks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<RatingChangeList>, ApiError> {
    let spec = FilterSpec::from_params(&params)?;
    let pool = state.pool()?;

    let query = ListQuery::from_filter(&spec);
    let items = storage::ratings::list_rating_changes(pool, &query).await?;

    tracing::debug!(
        clauses = query.predicates.len(),
        limit = query.limit,
        offset = query.offset,
        returned = items.len(),
        "listed rating changes"
    );

    Ok(Json(RatingChangeList { items }))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<RatingChangeRecord>, ApiError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest("ticker required".to_string()));
    }
    let pool = state.pool()?;

    let record = storage::ratings::latest_for_ticker(pool, ticker)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(record))
}

async fn recommend(State(state): State<AppState>) -> Result<Json<Vec<RankedCandidate>>, ApiError> {
    let pool = state.pool()?;

    let ratings = storage::ratings::latest_priced_ratings(pool).await?;
    let candidates = ratings.len();
    let ranked = ranking::rank(ratings, ranking::TOP_N);

    tracing::debug!(candidates, returned = ranked.len(), "ranked recommendations");

    Ok(Json(ranked))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
