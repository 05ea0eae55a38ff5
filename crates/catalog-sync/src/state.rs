use std::collections::BTreeMap;

use crate::catalog::ProductId;
use crate::log::LogLine;
use crate::product::Sku;

/// Errors from persisted sync state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state storage error: {0}")]
    Storage(String),
}

/// Per-store record of every SKU this system has upserted, and where it went.
///
/// Written after each successful upsert, read by the pruning sweep.
#[async_trait::async_trait]
pub trait SkuIndex: Send + Sync {
    async fn record(&self, store: &str, sku: &Sku, id: ProductId) -> Result<(), StateError>;

    async fn entries(&self, store: &str) -> Result<BTreeMap<Sku, ProductId>, StateError>;

    async fn forget(&self, store: &str, sku: &Sku) -> Result<(), StateError>;
}

/// Accumulated progress log per store, read back by the status call.
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, store: &str, lines: &[LogLine]) -> Result<(), StateError>;

    /// Rendered lines in the order they were appended.
    async fn lines(&self, store: &str) -> Result<Vec<String>, StateError>;

    async fn clear(&self, store: &str) -> Result<(), StateError>;
}
