// ── Record-to-domain conversion ──
//
// Bridges raw `vitrine_api::Record` rows into `CollectionItem`s. Typed
// columns are parsed leniently: a malformed timestamp or an unknown
// category becomes `None` rather than dropping the row. Rows without an
// id are skipped, since nothing downstream can key them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use vitrine_api::Record;

use crate::model::{Category, CollectionItem, ItemId, ItemStatus};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, also accepting the space-separated form
/// Postgres emits for `timestamptz` text.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_category(raw: &str) -> Option<Category> {
    Category::from_stored(raw).or_else(|| Category::from_slug(raw))
}

fn parse_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(ItemId::from(s.as_str())),
        Value::Number(n) => Some(ItemId::Opaque(n.to_string())),
        _ => None,
    }
}

// ── Conversion ─────────────────────────────────────────────────────

impl TryFrom<Record> for CollectionItem {
    type Error = Record;

    /// Fails (handing the record back) only when the row has no usable id.
    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let Some(id) = record.get("id").and_then(parse_id) else {
            return Err(record);
        };

        let created_at = record
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_datetime);
        let category = record
            .get("category")
            .and_then(Value::as_str)
            .and_then(parse_category);
        let status = record
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ItemStatus>().ok());
        let sort_order = record.get("sort_order").and_then(Value::as_i64);

        let fields: IndexMap<String, Value> = record.into_fields().into_iter().collect();

        Ok(Self {
            id,
            created_at,
            category,
            status,
            sort_order,
            fields,
        })
    }
}

/// Convert a query result into an item sequence, preserving service order.
pub fn items_from_records(records: Vec<Record>) -> Vec<Arc<CollectionItem>> {
    records
        .into_iter()
        .filter_map(|record| match CollectionItem::try_from(record) {
            Ok(item) => Some(Arc::new(item)),
            Err(record) => {
                debug!(fields = record.fields().len(), "skipping record without id");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Icon;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn project_row_converts() {
        let item = CollectionItem::try_from(record(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "title": "Storefront",
            "description": "Headless shop",
            "category": "Website",
            "status": "completed",
            "image_url": "https://cdn.example.com/a.jpg",
            "project_link": "https://shop.example.com",
            "created_at": "2024-05-01T12:00:00.123456+00:00"
        })))
        .unwrap();

        assert!(item.id.as_uuid().is_some());
        assert_eq!(item.title(), Some("Storefront"));
        assert_eq!(item.category, Some(Category::Website));
        assert_eq!(item.category_name(), Some("Web Development"));
        assert_eq!(item.status, Some(ItemStatus::Completed));
        assert_eq!(item.link(), Some("https://shop.example.com"));
        assert!(item.created_at.is_some());
    }

    #[test]
    fn service_and_testimonial_rows_convert() {
        let service = CollectionItem::try_from(record(json!({
            "id": 3, "name": "Graphic Design", "icon": "Palette", "sort_order": 2
        })))
        .unwrap();
        assert_eq!(service.title(), Some("Graphic Design"));
        assert_eq!(service.icon(), Some(Icon::Palette));
        assert_eq!(service.sort_order, Some(2));

        let testimonial = CollectionItem::try_from(record(json!({
            "id": "t1", "client_name": "Ada", "review": "Great work"
        })))
        .unwrap();
        assert_eq!(testimonial.title(), Some("Ada"));
        assert_eq!(testimonial.description(), Some("Great work"));
    }

    #[test]
    fn postgres_text_timestamps_parse() {
        let ts = parse_datetime("2024-05-01 12:00:00.5+00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:00:00.500+00:00");
    }

    #[test]
    fn lenient_columns_and_skipped_rows() {
        let rows = vec![
            record(json!({ "id": "a", "category": "Pottery", "created_at": "yesterday" })),
            record(json!({ "title": "no id" })),
        ];
        let items = items_from_records(rows);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, None);
        assert_eq!(items[0].created_at, None);
    }
}
