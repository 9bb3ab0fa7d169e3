// ── Collection item ──

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::category::{Category, ItemStatus};
use super::icon::Icon;
use super::item_id::ItemId;

/// An immutable snapshot of one row of a watched collection.
///
/// The typed fields are the ones the engine orders or filters by; every
/// other column is kept verbatim in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: ItemId,
    pub created_at: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
    pub sort_order: Option<i64>,
    pub fields: IndexMap<String, Value>,
}

impl CollectionItem {
    fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// Heading: `title`, `name`, or `client_name`, whichever is present.
    pub fn title(&self) -> Option<&str> {
        self.first_text(&["title", "name", "client_name"])
    }

    /// Body text: `description` or `review`.
    pub fn description(&self) -> Option<&str> {
        self.first_text(&["description", "review"])
    }

    pub fn image_url(&self) -> Option<&str> {
        self.text("image_url")
    }

    pub fn link(&self) -> Option<&str> {
        self.first_text(&["project_link", "link"])
    }

    /// Resolved icon, if the row names one.
    pub fn icon(&self) -> Option<Icon> {
        self.text("icon").map(Icon::resolve)
    }

    /// Display heading for the category, if any.
    pub fn category_name(&self) -> Option<&'static str> {
        self.category.map(Category::display_name)
    }
}
