use crate::domain::rating::NewRatingChange;
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of the upstream ratings feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    #[serde(default)]
    pub next_page: String,
}

impl FeedPage {
    pub fn next_page_key(&self) -> Option<&str> {
        let key = self.next_page.trim();
        (!key.is_empty()).then_some(key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub ticker: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub brokerage: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub rating_from: String,
    #[serde(default)]
    pub rating_to: String,
    #[serde(default)]
    pub target_from: String,
    #[serde(default)]
    pub target_to: String,
    pub time: String,
}

impl FeedItem {
    pub fn validate_and_into_new(
        self,
        current_price: Option<f64>,
    ) -> anyhow::Result<NewRatingChange> {
        let ticker = self.ticker.trim().to_string();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");

        let target_from = parse_price_target(&self.target_from)
            .with_context(|| format!("parsing target_from {:?}", self.target_from))?;
        let target_to = parse_price_target(&self.target_to)
            .with_context(|| format!("parsing target_to {:?}", self.target_to))?;

        let time = DateTime::parse_from_rfc3339(self.time.trim())
            .with_context(|| format!("parsing time {:?}", self.time))?
            .with_timezone(&Utc);

        Ok(NewRatingChange {
            ticker,
            company: self.company.trim().to_string(),
            brokerage: self.brokerage.trim().to_string(),
            action: self.action.trim().to_string(),
            rating_from: self.rating_from.trim().to_string(),
            rating_to: self.rating_to.trim().to_string(),
            target_from,
            target_to,
            time,
            current_price: current_price.filter(|p| p.is_finite()),
        })
    }
}

/// Parses a feed price target such as `"$1,234.50"`. An empty string means no target.
pub fn parse_price_target(raw: &str) -> anyhow::Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let cleaned = trimmed.replace(',', "");
    let cleaned = cleaned.strip_prefix('$').unwrap_or(&cleaned);
    let value = cleaned
        .parse::<f64>()
        .with_context(|| format!("not a number: {trimmed}"))?;
    ensure!(value.is_finite(), "price target must be finite (got {trimmed})");
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn feed_item(target_from: &str, target_to: &str) -> FeedItem {
        FeedItem {
            ticker: "TCK".to_string(),
            company: "Comp".to_string(),
            brokerage: "Brok".to_string(),
            action: "upgraded by".to_string(),
            rating_from: "Sell".to_string(),
            rating_to: "Buy".to_string(),
            target_from: target_from.to_string(),
            target_to: target_to.to_string(),
            time: "2025-01-13T00:30:05.813548892Z".to_string(),
        }
    }

    #[test]
    fn parse_price_target_strips_currency_and_separators() {
        assert_eq!(parse_price_target("$4.20").unwrap(), Some(4.2));
        assert_eq!(parse_price_target("$1,234.50").unwrap(), Some(1234.5));
        assert_eq!(parse_price_target(" 12 ").unwrap(), Some(12.0));
        assert_eq!(parse_price_target("").unwrap(), None);
        assert_eq!(parse_price_target("   ").unwrap(), None);
    }

    #[test]
    fn parse_price_target_rejects_garbage() {
        assert!(parse_price_target("not-a-number").is_err());
        assert!(parse_price_target("$inf").is_err());
    }

    #[test]
    fn validate_converts_targets_and_time() {
        let new = feed_item("$10.50", "$12.00")
            .validate_and_into_new(Some(123.45))
            .unwrap();
        assert_eq!(new.ticker, "TCK");
        assert_eq!(new.target_from, Some(10.5));
        assert_eq!(new.target_to, Some(12.0));
        assert_eq!(new.current_price, Some(123.45));
        assert_eq!(
            new.time,
            Utc.with_ymd_and_hms(2025, 1, 13, 0, 30, 5).unwrap()
                + chrono::Duration::nanoseconds(813_548_892)
        );
    }

    #[test]
    fn validate_keeps_missing_targets_absent() {
        let new = feed_item("", "").validate_and_into_new(None).unwrap();
        assert_eq!(new.target_from, None);
        assert_eq!(new.target_to, None);
        assert_eq!(new.current_price, None);
    }

    #[test]
    fn validate_rejects_bad_target_and_time() {
        let err = feed_item("not-a-number", "$1")
            .validate_and_into_new(None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("target_from"));

        let mut item = feed_item("$1", "$2");
        item.time = "yesterday".to_string();
        assert!(item.validate_and_into_new(None).is_err());

        let mut item = feed_item("$1", "$2");
        item.ticker = "  ".to_string();
        assert!(item.validate_and_into_new(None).is_err());
    }

    #[test]
    fn feed_page_defaults_missing_next_page() {
        let page: FeedPage = serde_json::from_value(json!({
            "items": [{
                "ticker": "AKBA",
                "company": "Akebia Therapeutics",
                "brokerage": "HC Wainwright",
                "action": "reiterated by",
                "rating_from": "Buy",
                "rating_to": "Buy",
                "target_from": "$4.20",
                "target_to": "$4.70",
                "time": "2025-01-13T00:30:05.813548892Z"
            }]
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_page_key(), None);

        let page: FeedPage =
            serde_json::from_value(json!({"items": [], "next_page": "AKBA"})).unwrap();
        assert_eq!(page.next_page_key(), Some("AKBA"));
    }
}
