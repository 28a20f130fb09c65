use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LIMIT: i64 = 100;
pub const DEFAULT_OFFSET: i64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("unknown sort field: {0:?}")]
    UnknownSortField(String),
}

/// Raw listing parameters as they arrive on the query string.
///
/// Every value is kept as text so that a malformed number or date drops its filter instead of
/// failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub action: Option<String>,
    pub brokerage: Option<String>,
    pub rating_from: Option<String>,
    pub rating_to: Option<String>,
    pub min_target_from: Option<String>,
    pub max_target_from: Option<String>,
    pub min_target_to: Option<String>,
    pub max_target_to: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Columns of `rating_changes` that callers may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ticker,
    Company,
    Brokerage,
    Action,
    RatingFrom,
    RatingTo,
    TargetFrom,
    TargetTo,
    Time,
    CurrentPrice,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Ticker,
        Field::Company,
        Field::Brokerage,
        Field::Action,
        Field::RatingFrom,
        Field::RatingTo,
        Field::TargetFrom,
        Field::TargetTo,
        Field::Time,
        Field::CurrentPrice,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Ticker => "ticker",
            Field::Company => "company",
            Field::Brokerage => "brokerage",
            Field::Action => "action",
            Field::RatingFrom => "rating_from",
            Field::RatingTo => "rating_to",
            Field::TargetFrom => "target_from",
            Field::TargetTo => "target_to",
            Field::Time => "time",
            Field::CurrentPrice => "current_price",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("DESC") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub search: Option<String>,
    pub actions: Vec<String>,
    pub brokerages: Vec<String>,
    pub ratings_from: Vec<String>,
    pub ratings_to: Vec<String>,
    pub target_from: Range<f64>,
    pub target_to: Range<f64>,
    pub time: Range<DateTime<Utc>>,
    pub sort: Field,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            search: None,
            actions: Vec::new(),
            brokerages: Vec::new(),
            ratings_from: Vec::new(),
            ratings_to: Vec::new(),
            target_from: Range::default(),
            target_to: Range::default(),
            time: Range::default(),
            sort: Field::Ticker,
            order: SortOrder::Asc,
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl FilterSpec {
    /// Builds a filter from raw parameters. Only an unknown sort field is an error; every other
    /// malformed value leaves its facet unconstrained.
    pub fn from_params(params: &ListParams) -> Result<Self, ListingError> {
        let sort = match params.sort.as_deref().map(str::trim) {
            None | Some("") => Field::Ticker,
            Some(name) => Field::from_name(name)
                .ok_or_else(|| ListingError::UnknownSortField(name.to_string()))?,
        };

        Ok(Self {
            search: params.search.clone().filter(|s| !s.is_empty()),
            actions: split_list(params.action.as_deref()),
            brokerages: split_list(params.brokerage.as_deref()),
            ratings_from: split_list(params.rating_from.as_deref()),
            ratings_to: split_list(params.rating_to.as_deref()),
            target_from: Range {
                min: parse_number(params.min_target_from.as_deref()),
                max: parse_number(params.max_target_from.as_deref()),
            },
            target_to: Range {
                min: parse_number(params.min_target_to.as_deref()),
                max: parse_number(params.max_target_to.as_deref()),
            },
            time: Range {
                min: parse_timestamp(params.date_from.as_deref()),
                max: parse_timestamp(params.date_to.as_deref()),
            },
            sort,
            order: SortOrder::parse(params.order.as_deref()),
            limit: parse_int(params.limit.as_deref())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_LIMIT),
            offset: parse_int(params.offset.as_deref())
                .filter(|v| *v >= 0)
                .unwrap_or(DEFAULT_OFFSET),
        })
    }
}

/// Splits a comma-separated parameter, trimming segments and dropping empty ones.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw?.parse::<i64>().ok()
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params() -> ListParams {
        ListParams::default()
    }

    #[test]
    fn empty_params_use_defaults() {
        let spec = FilterSpec::from_params(&params()).unwrap();
        assert_eq!(spec, FilterSpec::default());
        assert_eq!(spec.sort, Field::Ticker);
        assert_eq!(spec.order, SortOrder::Asc);
        assert_eq!(spec.limit, 100);
        assert_eq!(spec.offset, 0);
    }

    #[test]
    fn split_list_trims_and_drops_empty_segments() {
        assert_eq!(
            split_list(Some(" upgraded by, ,reiterated by,,")),
            vec!["upgraded by".to_string(), "reiterated by".to_string()]
        );
        assert!(split_list(Some(" , ")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn order_is_desc_only_on_case_insensitive_match() {
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("DeSc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("descending")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some(" desc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("desc ")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(None), SortOrder::Asc);
    }

    #[test]
    fn search_keeps_surrounding_whitespace() {
        let mut p = params();
        p.search = Some(" by".to_string());
        assert_eq!(
            FilterSpec::from_params(&p).unwrap().search.as_deref(),
            Some(" by")
        );

        p.search = Some("   ".to_string());
        assert_eq!(
            FilterSpec::from_params(&p).unwrap().search.as_deref(),
            Some("   ")
        );

        p.search = Some(String::new());
        assert_eq!(FilterSpec::from_params(&p).unwrap().search, None);
    }

    #[test]
    fn page_bounds_override_only_when_valid() {
        let mut p = params();
        p.limit = Some("0".to_string());
        p.offset = Some("-1".to_string());
        let spec = FilterSpec::from_params(&p).unwrap();
        assert_eq!((spec.limit, spec.offset), (100, 0));

        p.limit = Some("25".to_string());
        p.offset = Some("0".to_string());
        let spec = FilterSpec::from_params(&p).unwrap();
        assert_eq!((spec.limit, spec.offset), (25, 0));

        p.limit = Some("ten".to_string());
        p.offset = Some("50".to_string());
        let spec = FilterSpec::from_params(&p).unwrap();
        assert_eq!((spec.limit, spec.offset), (100, 50));

        p.limit = Some(" 5".to_string());
        p.offset = Some("7 ".to_string());
        let spec = FilterSpec::from_params(&p).unwrap();
        assert_eq!((spec.limit, spec.offset), (100, 0));
    }

    #[test]
    fn malformed_numbers_and_dates_are_dropped() {
        let mut p = params();
        p.min_target_from = Some("abc".to_string());
        p.max_target_to = Some(" 4".to_string());
        p.max_target_from = Some("20.5".to_string());
        p.min_target_to = Some("NaN".to_string());
        p.date_from = Some("2025-13-45".to_string());
        p.date_to = Some("2025-01-31T00:00:00Z".to_string());
        let spec = FilterSpec::from_params(&p).unwrap();

        assert_eq!(spec.target_from, Range { min: None, max: Some(20.5) });
        assert_eq!(spec.target_to, Range::default());
        assert_eq!(spec.time.min, None);
        assert_eq!(
            spec.time.max,
            Some(Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn sort_field_is_allow_listed() {
        let mut p = params();
        p.sort = Some("time".to_string());
        assert_eq!(FilterSpec::from_params(&p).unwrap().sort, Field::Time);

        p.sort = Some("  ".to_string());
        assert_eq!(FilterSpec::from_params(&p).unwrap().sort, Field::Ticker);

        p.sort = Some("ticker; DROP TABLE rating_changes".to_string());
        assert_eq!(
            FilterSpec::from_params(&p).unwrap_err(),
            ListingError::UnknownSortField("ticker; DROP TABLE rating_changes".to_string())
        );

        p.sort = Some("id".to_string());
        assert!(FilterSpec::from_params(&p).is_err());
    }

    #[test]
    fn every_field_round_trips_through_its_column_name() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.column()), Some(field));
        }
    }
}
