pub mod schema;
pub mod store;

pub use store::{CatalogStore, LOG_RETENTION_SECS, StoreError};
