use std::fmt;

use crate::catalog::ProductId;
use crate::classify::Classification;
use crate::error::SyncError;
use crate::log::LogLine;
use crate::product::Sku;

/// A best-effort write step of the per-product pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Content,
    Price,
    Provenance,
    ProductType,
    Variations,
    Stock,
    Manufacturer,
    Supplier,
    Categories,
    Images,
    Verification,
    Tracking,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Content => "content",
            Self::Price => "price",
            Self::Provenance => "provenance",
            Self::ProductType => "product type",
            Self::Variations => "variations",
            Self::Stock => "stock",
            Self::Manufacturer => "manufacturer",
            Self::Supplier => "supplier",
            Self::Categories => "categories",
            Self::Images => "images",
            Self::Verification => "verification",
            Self::Tracking => "tracking",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub field: Field,
    pub result: Result<(), String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    Created,
    Updated,
    /// A hard stop (detail fetch or create failure) dropped the product.
    Skipped,
}

/// Everything that happened to one remote product during a chunk.
#[derive(Debug, Clone)]
pub struct ProductOutcome {
    pub remote_id: i64,
    pub sku: Option<Sku>,
    pub product_id: Option<ProductId>,
    pub action: ProductAction,
    pub classification: Option<Classification>,
    pub variations_written: usize,
    pub fields: Vec<FieldOutcome>,
    pub skip_reason: Option<SyncError>,
}

impl ProductOutcome {
    pub(crate) fn new(remote_id: i64) -> Self {
        Self {
            remote_id,
            sku: None,
            product_id: None,
            action: ProductAction::Skipped,
            classification: None,
            variations_written: 0,
            fields: Vec::new(),
            skip_reason: None,
        }
    }

    pub(crate) fn skipped(mut self, reason: SyncError) -> Self {
        self.action = ProductAction::Skipped;
        self.skip_reason = Some(reason);
        self
    }

    pub(crate) fn record(&mut self, field: Field, result: Result<(), String>) {
        self.fields.push(FieldOutcome { field, result });
    }

    /// True unless a hard stop dropped the product. Field failures do not count.
    pub fn succeeded(&self) -> bool {
        self.action != ProductAction::Skipped
    }

    pub fn failed_fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|f| f.result.is_err())
            .map(|f| f.field)
            .collect()
    }
}

/// Result of one page of sync, the unit of resumability.
#[derive(Debug, Clone)]
pub struct SyncChunkResult {
    pub success: bool,
    /// Products that made it past both hard stops.
    pub processed: usize,
    /// Remote-reported total, for progress display.
    pub total_results: u64,
    /// Cursor to request next, `None` when exhausted.
    pub next_page: Option<u32>,
    pub logs: Vec<LogLine>,
    pub outcomes: Vec<ProductOutcome>,
    pub error: Option<SyncError>,
}

impl SyncChunkResult {
    pub(crate) fn failed(error: SyncError, logs: Vec<LogLine>) -> Self {
        Self {
            success: false,
            processed: 0,
            total_results: 0,
            next_page: None,
            logs,
            outcomes: Vec::new(),
            error: Some(error),
        }
    }
}

/// Result of a pruning sweep for one store.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub store: String,
    pub deleted: Vec<(Sku, ProductId)>,
    pub failed: Vec<(Sku, String)>,
    /// Tracked SKUs still present upstream.
    pub kept: usize,
    /// Set when the sweep stopped before deleting anything.
    pub aborted: Option<SyncError>,
    pub logs: Vec<LogLine>,
}

/// Totals of a full multi-store run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub pages: usize,
    /// Per-store page errors; other stores still ran.
    pub errors: Vec<String>,
    pub pruned: Vec<PruneReport>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of syncing one product by remote id.
#[derive(Debug, Clone)]
pub struct SingleProductResult {
    pub outcome: Option<ProductOutcome>,
    pub logs: Vec<LogLine>,
    pub error: Option<SyncError>,
}

/// Listing row for browsing a store's remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedProduct {
    pub id: i64,
    pub name: String,
    pub sku: Sku,
}
