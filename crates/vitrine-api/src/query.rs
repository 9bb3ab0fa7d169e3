// Query model shared by every collection service.
//
// A query names one collection, a conjunction of equality filters, one
// sort key, and an optional row limit. REST services render it as a
// PostgREST-style query string; the in-memory service evaluates it directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::Error;
use crate::record::{Record, compare_values};

/// Field every collection is ordered by unless a surface says otherwise.
pub const DEFAULT_ORDER_FIELD: &str = "created_at";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort key for a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

impl Default for OrderBy {
    /// Newest first.
    fn default() -> Self {
        Self::desc(DEFAULT_ORDER_FIELD)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.field, self.direction)
    }
}

/// Equality predicate on one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.field_text(&self.field).as_deref() == Some(self.value.as_str())
    }
}

/// An ordered query against one named collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    #[serde(default)]
    pub order: OrderBy,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    /// All rows of `collection`, newest first.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order: OrderBy::default(),
            limit: None,
        }
    }

    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(FieldFilter::eq(field, value));
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a record satisfies every filter of this query.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Filter, sort, and truncate a set of records the way the service would.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Vec<Record> {
        let mut rows: Vec<Record> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        let field = self.order.field.as_str();
        rows.sort_by(|a, b| {
            let ord = compare_values(a.get(field), b.get(field));
            match self.order.direction {
                Direction::Asc => ord,
                // Keep missing values last in both directions.
                Direction::Desc => match (a.get(field), b.get(field)) {
                    (Some(_), Some(_)) => ord.reverse(),
                    _ => ord,
                },
            }
        });

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }

    /// Render this query as a PostgREST-style URL under `rest_base`.
    ///
    /// `GET {rest_base}/{collection}?select=*&order={field}.{dir}&{field}=eq.{value}&limit={n}`
    pub fn to_url(&self, rest_base: &Url) -> Result<Url, Error> {
        let mut url = rest_base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(&self.collection);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            pairs.append_pair("order", &self.order.to_string());
            for filter in &self.filters {
                pairs.append_pair(&filter.field, &format!("eq.{}", filter.value));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        Ok(url)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} order={}", self.collection, self.order)?;
        for filter in &self.filters {
            write!(f, " {}={}", filter.field, filter.value)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit={limit}")?;
        }
        Ok(())
    }
}
