use crate::config::Settings;
use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const CHART_USER_AGENT: &str = "Mozilla/5.0 (compatible; ratings-worker/0.1)";

#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    async fn current_price(&self, ticker: &str) -> Result<f64>;
}

/// Reads `regularMarketPrice` from a Yahoo-style chart endpoint.
#[derive(Debug, Clone)]
pub struct ChartPriceProvider {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: f64,
}

impl ChartPriceProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("failed to build price provider http client")?;

        let base_url = Url::parse(&settings.price_provider_base_url).with_context(|| {
            format!(
                "invalid PRICE_PROVIDER_BASE_URL: {}",
                settings.price_provider_base_url
            )
        })?;

        Ok(Self { http, base_url })
    }

    /// Chart URL for `ticker`, which is percent-encoded as a single path segment.
    fn url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                anyhow::anyhow!("price provider base url cannot carry a path: {}", self.base_url)
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl PriceProvider for ChartPriceProvider {
    async fn current_price(&self, ticker: &str) -> Result<f64> {
        let res = self
            .http
            .get(self.url(ticker)?)
            .header(USER_AGENT, HeaderValue::from_static(CHART_USER_AGENT))
            .query(&[
                ("region", "US"),
                ("lang", "en-US"),
                ("includePrePost", "false"),
                ("interval", "1d"),
                ("range", "1d"),
            ])
            .send()
            .await
            .context("price request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read price response")?;
        if !status.is_success() {
            anyhow::bail!("price provider HTTP {status}: {text}");
        }

        parse_chart_price(&text, ticker)
    }
}

pub fn parse_chart_price(body: &str, ticker: &str) -> Result<f64> {
    let parsed = serde_json::from_str::<ChartResponse>(body)
        .with_context(|| format!("price response is not a chart payload: {body}"))?;

    if let Some(err) = parsed.chart.error.filter(|e| !e.is_null()) {
        anyhow::bail!("price provider error for {ticker}: {err}");
    }

    let price = parsed
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| r.meta.regular_market_price)
        .with_context(|| format!("no chart result for {ticker}"))?;

    anyhow::ensure!(price.is_finite(), "non-finite price for {ticker}");
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_regular_market_price() {
        let body = json!({
            "chart": {"result": [{"meta": {"regularMarketPrice": 123.45}}], "error": null}
        })
        .to_string();
        assert_eq!(parse_chart_price(&body, "TCK").unwrap(), 123.45);
    }

    #[test]
    fn surfaces_provider_error() {
        let body = json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data"}}
        })
        .to_string();
        let err = parse_chart_price(&body, "NOPE").unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn rejects_empty_result_and_bad_json() {
        let body = json!({"chart": {"result": []}}).to_string();
        assert!(parse_chart_price(&body, "TCK").is_err());
        assert!(parse_chart_price("not json", "TCK").is_err());
    }

    #[test]
    fn url_joins_base_and_ticker() {
        let provider = ChartPriceProvider {
            http: reqwest::Client::new(),
            base_url: Url::parse("https://example.test/").unwrap(),
        };
        assert_eq!(
            provider.url("AAPL").unwrap().as_str(),
            "https://example.test/v8/finance/chart/AAPL"
        );

        let nested = ChartPriceProvider {
            http: reqwest::Client::new(),
            base_url: Url::parse("https://example.test/proxy").unwrap(),
        };
        assert_eq!(
            nested.url("BRK.B").unwrap().as_str(),
            "https://example.test/proxy/v8/finance/chart/BRK.B"
        );
    }

    #[test]
    fn ticker_cannot_rewrite_the_request() {
        let provider = ChartPriceProvider {
            http: reqwest::Client::new(),
            base_url: Url::parse("https://example.test").unwrap(),
        };
        let url = provider.url("A/../B?range=max#x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v8/finance/chart/A%2F..%2FB%3Frange=max%23x"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }
}
