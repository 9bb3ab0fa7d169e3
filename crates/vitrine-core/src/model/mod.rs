// ── Domain model ──

pub mod category;
pub mod icon;
pub mod item;
pub mod item_id;

pub use category::{Category, ItemStatus, service_slug};
pub use icon::Icon;
pub use item::CollectionItem;
pub use item_id::ItemId;
