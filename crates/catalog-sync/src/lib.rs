pub mod axis;
pub mod catalog;
pub mod classify;
pub mod engine;
pub mod error;
pub mod log;
pub mod mapper;
pub mod outcome;
pub mod pricing;
pub mod product;
pub mod remote;
pub mod runner;
pub mod settings;
pub mod state;

pub use axis::{AxisConfig, AxisPath, default_axes, resolve_axes};
pub use catalog::{
    Catalog, CatalogError, MediaId, ProductDraft, ProductId, ProductSnapshot, ProductType,
    StockStatus, TermId, VariationDraft, VariationId,
};
pub use classify::{Classification, classify};
pub use engine::{PageReport, Reconciler};
pub use error::SyncError;
pub use log::{LogLine, RunLog};
pub use mapper::{AttributeValue, Combination, cartesian_product, extract_axis_values};
pub use outcome::{
    Field, FieldOutcome, ListedProduct, ProductAction, ProductOutcome, PruneReport, RunSummary,
    SingleProductResult, SyncChunkResult,
};
pub use product::{ProductSummary, RemoteProduct, Sku};
pub use remote::{Connector, ListingPage, MAX_LISTING_PAGES, RemoteCatalog, RemoteError};
pub use runner::SyncRunner;
pub use settings::SyncSettings;
pub use state::{LogStore, SkuIndex, StateError};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
