// vitrine-api: Async clients for remote collection services (queries + change feeds)

pub mod error;
pub mod feed;
pub mod memory;
pub mod query;
pub mod record;
pub mod rest;
pub mod service;
pub mod transport;

pub use error::Error;
pub use feed::{ReconnectConfig, WsFeed};
pub use memory::MemoryCollectionService;
pub use query::{Direction, FieldFilter, OrderBy, Query};
pub use record::Record;
pub use rest::RestCollectionClient;
pub use service::{ChangeKind, ChangeNotice, CollectionService, FeedHandle};
pub use transport::{TlsMode, TransportConfig};
