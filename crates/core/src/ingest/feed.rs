use crate::config::Settings;
use crate::domain::contract::FeedPage;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

#[async_trait::async_trait]
pub trait RatingsFeedClient: Send + Sync {
    fn feed_name(&self) -> &'static str;

    /// Fetches one page. `None` requests the first page.
    async fn fetch_page(&self, next_page: Option<&str>) -> Result<FeedPage>;
}

#[derive(Debug, Clone)]
pub struct HttpRatingsFeed {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpRatingsFeed {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_ratings_feed_url()?.to_string();
        let token = settings.require_ratings_feed_token()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("failed to build ratings feed http client")?;

        Ok(Self { http, url, token })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))?,
        );
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl RatingsFeedClient for HttpRatingsFeed {
    fn feed_name(&self) -> &'static str {
        "http_ratings_feed"
    }

    async fn fetch_page(&self, next_page: Option<&str>) -> Result<FeedPage> {
        let mut req = self.http.get(&self.url).headers(self.headers()?);
        if let Some(key) = next_page {
            req = req.query(&[("next_page", key)]);
        }

        let res = req.send().await.context("ratings feed request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read ratings feed response")?;

        if !status.is_success() {
            anyhow::bail!("ratings feed HTTP {status}: {text}");
        }

        serde_json::from_str::<FeedPage>(&text)
            .with_context(|| format!("failed to parse ratings feed page: {text}"))
    }
}
