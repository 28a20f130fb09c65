pub mod domain;
pub mod ingest;
pub mod query;
pub mod ranking;
pub mod storage;

pub mod config {
    use anyhow::Context;

    const DEFAULT_PRICE_PROVIDER_BASE_URL: &str = "https://query1.finance.yahoo.com";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub ratings_feed_url: Option<String>,
        pub ratings_feed_token: Option<String>,
        pub price_provider_base_url: String,
        pub http_timeout_secs: u64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                ratings_feed_url: std::env::var("RATINGS_FEED_URL").ok(),
                ratings_feed_token: std::env::var("RATINGS_FEED_TOKEN").ok(),
                price_provider_base_url: std::env::var("PRICE_PROVIDER_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PRICE_PROVIDER_BASE_URL.to_string()),
                http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_ratings_feed_url(&self) -> anyhow::Result<&str> {
            self.ratings_feed_url
                .as_deref()
                .context("RATINGS_FEED_URL is required")
        }

        pub fn require_ratings_feed_token(&self) -> anyhow::Result<&str> {
            self.ratings_feed_token
                .as_deref()
                .context("RATINGS_FEED_TOKEN is required")
        }
    }
}
