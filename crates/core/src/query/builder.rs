use crate::domain::rating::split_sub_micros;
use crate::query::filter::{Field, FilterSpec, Range, SortOrder};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

/// Columns matched by free-text search, in parameter order.
pub const SEARCH_FIELDS: [Field; 6] = [
    Field::Ticker,
    Field::Company,
    Field::Brokerage,
    Field::Action,
    Field::RatingFrom,
    Field::RatingTo,
];

const SELECT_RATING_CHANGES: &str =
    "SELECT ticker, company, brokerage, action, rating_from, rating_to, \
     target_from::TEXT AS target_from, target_to::TEXT AS target_to, time, time_nanos \
     FROM rating_changes";

/// Holds the nanoseconds below the microsecond precision of `time`.
pub const TIME_NANOS_COLUMN: &str = "time_nanos";

#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    /// Sub-microsecond part of a timestamp, compared against [`TIME_NANOS_COLUMN`].
    Nanos(i32),
    Integer(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    fn as_sql(self) -> &'static str {
        match self {
            Comparison::AtLeast => " >= ",
            Comparison::AtMost => " <= ",
        }
    }
}

/// One WHERE clause. Identifiers come from [`Field`] only; user values are always bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Search {
        pattern: String,
    },
    OneOf {
        field: Field,
        values: Vec<String>,
    },
    Bound {
        field: Field,
        cmp: Comparison,
        value: BindValue,
    },
}

impl Predicate {
    pub fn params(&self) -> Vec<BindValue> {
        match self {
            Predicate::Search { pattern } => SEARCH_FIELDS
                .iter()
                .map(|_| BindValue::Text(pattern.clone()))
                .collect(),
            Predicate::OneOf { values, .. } => {
                values.iter().cloned().map(BindValue::Text).collect()
            }
            Predicate::Bound {
                value: BindValue::Timestamp(t),
                ..
            } => {
                let (micros, nanos) = split_sub_micros(t);
                vec![BindValue::Timestamp(micros), BindValue::Nanos(nanos)]
            }
            Predicate::Bound { value, .. } => vec![value.clone()],
        }
    }

    fn push_to(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Predicate::Search { pattern } => {
                qb.push("(");
                for (i, field) in SEARCH_FIELDS.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(field.column()).push(" ILIKE ");
                    qb.push_bind(pattern.clone());
                }
                qb.push(")");
            }
            Predicate::OneOf { field, values } => {
                qb.push(field.column()).push(" IN (");
                let mut list = qb.separated(", ");
                for value in values {
                    list.push_bind(value.clone());
                }
                list.push_unseparated(")");
            }
            Predicate::Bound {
                field,
                cmp,
                value: BindValue::Timestamp(t),
            } => {
                // Row comparison keeps the bound exact below one microsecond.
                let (micros, nanos) = split_sub_micros(t);
                qb.push("(")
                    .push(field.column())
                    .push(", ")
                    .push(TIME_NANOS_COLUMN)
                    .push(")")
                    .push(cmp.as_sql())
                    .push("(");
                qb.push_bind(micros).push(", ").push_bind(nanos).push(")");
            }
            Predicate::Bound { field, cmp, value } => {
                qb.push(field.column()).push(cmp.as_sql());
                push_bind_value(qb, value);
            }
        }
    }
}

fn push_bind_value(qb: &mut QueryBuilder<'static, Postgres>, value: &BindValue) {
    match value {
        BindValue::Text(v) => qb.push_bind(v.clone()),
        BindValue::Number(v) => qb.push_bind(*v),
        BindValue::Timestamp(v) => qb.push_bind(*v),
        BindValue::Nanos(v) => qb.push_bind(*v),
        BindValue::Integer(v) => qb.push_bind(*v),
    };
}

/// Escapes LIKE metacharacters so search text matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Turns a filter into predicates in the fixed emission order: search, set filters
/// (action, brokerage, rating_from, rating_to), then target_from, target_to and time bounds.
pub fn predicates(spec: &FilterSpec) -> Vec<Predicate> {
    let mut out = Vec::new();

    if let Some(search) = &spec.search {
        out.push(Predicate::Search {
            pattern: format!("%{}%", escape_like(search)),
        });
    }

    for (field, values) in [
        (Field::Action, &spec.actions),
        (Field::Brokerage, &spec.brokerages),
        (Field::RatingFrom, &spec.ratings_from),
        (Field::RatingTo, &spec.ratings_to),
    ] {
        if !values.is_empty() {
            out.push(Predicate::OneOf {
                field,
                values: values.clone(),
            });
        }
    }

    push_range(&mut out, Field::TargetFrom, &spec.target_from, BindValue::Number);
    push_range(&mut out, Field::TargetTo, &spec.target_to, BindValue::Number);
    push_range(&mut out, Field::Time, &spec.time, BindValue::Timestamp);

    out
}

fn push_range<T: Copy>(
    out: &mut Vec<Predicate>,
    field: Field,
    range: &Range<T>,
    to_value: fn(T) -> BindValue,
) {
    if let Some(min) = range.min {
        out.push(Predicate::Bound {
            field,
            cmp: Comparison::AtLeast,
            value: to_value(min),
        });
    }
    if let Some(max) = range.max {
        out.push(Predicate::Bound {
            field,
            cmp: Comparison::AtMost,
            value: to_value(max),
        });
    }
}

/// A fully resolved listing request: predicates, ordering and page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub predicates: Vec<Predicate>,
    pub sort: Field,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl ListQuery {
    pub fn from_filter(spec: &FilterSpec) -> Self {
        Self {
            predicates: predicates(spec),
            sort: spec.sort,
            order: spec.order,
            limit: spec.limit,
            offset: spec.offset,
        }
    }

    /// Positional parameters in the order they are bound.
    pub fn params(&self) -> Vec<BindValue> {
        let mut out: Vec<BindValue> = self.predicates.iter().flat_map(Predicate::params).collect();
        out.push(BindValue::Integer(self.limit));
        out.push(BindValue::Integer(self.offset));
        out
    }

    pub fn to_query_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(SELECT_RATING_CHANGES);

        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_to(&mut qb);
        }

        // `id` keeps pages disjoint when the sort column has duplicates.
        qb.push(" ORDER BY ")
            .push(self.sort.column())
            .push(" ")
            .push(self.order.as_sql());
        if self.sort == Field::Time {
            qb.push(", ")
                .push(TIME_NANOS_COLUMN)
                .push(" ")
                .push(self.order.as_sql());
        }
        qb.push(", id ASC");

        qb.push(" LIMIT ").push_bind(self.limit);
        qb.push(" OFFSET ").push_bind(self.offset);
        qb
    }
}
