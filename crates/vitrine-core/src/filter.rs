// ── Filter controller ──
//
// Holds the active filter for one surface and hands out fetch tickets.
// Every fetch carries a ticket; a response is applied only when its ticket
// is newer than the last applied one and was issued under the filter that
// is still active. That is the whole ordering story: no debouncing, no
// cancellation of in-flight fetches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;

use vitrine_api::Query;

use crate::error::CoreError;
use crate::model::{Category, ItemStatus};

// ── Filter ───────────────────────────────────────────────────────────

/// The enumerated filter values a surface accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    #[default]
    All,
    Status(ItemStatus),
    Category(Category),
}

impl Filter {
    /// The `(column, stored value)` equality this filter adds to a query.
    pub fn predicate(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::All => None,
            Self::Status(status) => Some(("status", status.as_str())),
            Self::Category(category) => Some(("category", category.stored_value())),
        }
    }

    /// Narrow `query` by this filter.
    pub fn apply_to(self, query: Query) -> Query {
        match self.predicate() {
            Some((field, value)) => query.filter_eq(field, value),
            None => query,
        }
    }

    /// The two status filters.
    pub fn statuses() -> impl Iterator<Item = Self> {
        [ItemStatus::Ongoing, ItemStatus::Completed]
            .into_iter()
            .map(Self::Status)
    }

    /// One filter per category.
    pub fn categories() -> impl Iterator<Item = Self> {
        Category::all().map(Self::Category)
    }
}

impl FromStr for Filter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if let Ok(status) = raw.parse::<ItemStatus>() {
            return Ok(Self::Status(status));
        }
        if let Some(category) = Category::from_slug(raw) {
            return Ok(Self::Category(category));
        }
        Err(CoreError::InvalidFilter {
            value: s.to_owned(),
            expected: "all, completed, ongoing, or a category slug".into(),
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Status(status) => f.write_str(status.as_str()),
            Self::Category(category) => f.write_str(category.slug()),
        }
    }
}

impl TryFrom<String> for Filter {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.to_string()
    }
}

// ── Tickets ──────────────────────────────────────────────────────────

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchReason {
    Initial,
    FilterChanged,
    ChangeFeed,
    Manual,
}

/// One issued fetch: a monotonic sequence number plus the filter it ran
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchTicket {
    pub seq: u64,
    pub filter: Filter,
    pub reason: FetchReason,
}

// ── FilterController ─────────────────────────────────────────────────

/// Active filter plus ticket bookkeeping for one surface.
#[derive(Debug, Clone)]
pub struct FilterController {
    current: Filter,
    issued: u64,
    applied: u64,
}

impl FilterController {
    pub fn new(initial: Filter) -> Self {
        Self {
            current: initial,
            issued: 0,
            applied: 0,
        }
    }

    pub fn current(&self) -> Filter {
        self.current
    }

    /// Switch filters. Returns the ticket for the one fetch the change
    /// requires, or `None` when `filter` is already active.
    pub fn set(&mut self, filter: Filter) -> Option<FetchTicket> {
        if filter == self.current {
            return None;
        }
        self.current = filter;
        Some(self.issue(FetchReason::FilterChanged))
    }

    /// Issue a ticket under the current filter.
    pub fn issue(&mut self, reason: FetchReason) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            seq: self.issued,
            filter: self.current,
            reason,
        }
    }

    /// Decide whether a response for `ticket` may be applied, recording it
    /// as the latest applied when it may.
    pub fn accept(&mut self, ticket: &FetchTicket) -> bool {
        if ticket.seq <= self.applied || ticket.filter != self.current {
            return false;
        }
        self.applied = ticket.seq;
        true
    }

    /// Sequence number of the last applied response (0 before any).
    pub fn last_applied(&self) -> u64 {
        self.applied
    }

    /// Tickets issued but not yet superseded by an applied response.
    pub fn has_pending(&self) -> bool {
        self.issued > self.applied
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new(Filter::All)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_enumerated_values() {
        assert_eq!("all".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!(
            "completed".parse::<Filter>().unwrap(),
            Filter::Status(ItemStatus::Completed)
        );
        assert_eq!(
            "ongoing".parse::<Filter>().unwrap(),
            Filter::Status(ItemStatus::Ongoing)
        );
        assert_eq!(
            "video".parse::<Filter>().unwrap(),
            Filter::Category(Category::Video)
        );
    }

    #[test]
    fn rejects_unknown_values() {
        let err = "archived".parse::<Filter>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidFilter { ref value, .. } if value == "archived"));
    }

    #[test]
    fn category_filter_uses_stored_value() {
        let query = Filter::Category(Category::Graphics).apply_to(Query::new("projects"));
        assert_eq!(query.filters[0].field, "category");
        assert_eq!(query.filters[0].value, "Graphics");
        assert!(Filter::All.apply_to(Query::new("projects")).filters.is_empty());
    }

    #[test]
    fn serde_uses_display_form() {
        let json = serde_json::to_string(&Filter::Status(ItemStatus::Ongoing)).unwrap();
        assert_eq!(json, "\"ongoing\"");
        let back: Filter = serde_json::from_str("\"ads\"").unwrap();
        assert_eq!(back, Filter::Category(Category::Ads));
        assert!(serde_json::from_str::<Filter>("\"nope\"").is_err());
    }

    #[test]
    fn setting_same_filter_is_a_noop() {
        let mut ctl = FilterController::default();
        assert!(ctl.set(Filter::All).is_none());

        let ticket = ctl.set(Filter::Status(ItemStatus::Completed)).unwrap();
        assert_eq!(ticket.seq, 1);
        assert_eq!(ticket.reason, FetchReason::FilterChanged);
        assert!(ctl.set(Filter::Status(ItemStatus::Completed)).is_none());
    }

    #[test]
    fn stale_tickets_are_rejected() {
        let mut ctl = FilterController::default();
        let first = ctl.issue(FetchReason::Initial);
        let second = ctl.issue(FetchReason::ChangeFeed);

        assert!(ctl.accept(&second));
        assert!(!ctl.accept(&first));
        assert_eq!(ctl.last_applied(), 2);
        assert!(!ctl.has_pending());
    }

    #[test]
    fn tickets_from_a_previous_filter_are_rejected() {
        let mut ctl = FilterController::default();
        let old = ctl.issue(FetchReason::ChangeFeed);
        let new = ctl.set(Filter::Status(ItemStatus::Ongoing)).unwrap();

        assert!(!ctl.accept(&old));
        assert!(ctl.has_pending());
        assert!(ctl.accept(&new));
    }
}
