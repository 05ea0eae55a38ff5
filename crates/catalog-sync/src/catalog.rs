use std::fmt;

use crate::product::Sku;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Destination identifier of a product record.
    ProductId
);
id_type!(VariationId);
id_type!(
    /// Destination identifier of a taxonomy term (category or attribute value).
    TermId
);
id_type!(MediaId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Simple,
    Variable,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Variable => "variable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(Self::Simple),
            "variable" => Some(Self::Variable),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
        }
    }
}

/// Content fields written on create and on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub sku: Sku,
    pub title: String,
    pub body: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariationDraft {
    pub sku: String,
    pub title: String,
    pub price: f64,
    pub stock_status: StockStatus,
    pub stock_quantity: i64,
    /// `(attribute slug, term slug)` pairs in axis order.
    pub attributes: Vec<(String, String)>,
}

/// State of a destination product read back after writing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub sku: Sku,
    pub product_type: Option<ProductType>,
    pub variation_count: usize,
    pub featured_media: Option<MediaId>,
    pub gallery: Vec<MediaId>,
}

/// Errors reported by the destination catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("write rejected: {0}")]
    Write(String),

    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// The destination storefront catalog.
///
/// Every call is a single write or read; the sync engine sequences them and
/// decides which failures are fatal for a product.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductId>, CatalogError>;

    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError>;

    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<(), CatalogError>;

    async fn set_price(&self, id: ProductId, price: f64) -> Result<(), CatalogError>;

    async fn set_product_type(&self, id: ProductId, kind: ProductType) -> Result<(), CatalogError>;

    async fn set_stock(
        &self,
        id: ProductId,
        status: StockStatus,
        quantity: i64,
    ) -> Result<(), CatalogError>;

    /// Free-form product metadata (manufacturer, supplier, provenance).
    async fn set_meta(&self, id: ProductId, key: &str, value: &str) -> Result<(), CatalogError>;

    /// Register an attribute definition if it does not exist yet.
    async fn ensure_attribute(&self, slug: &str, label: &str) -> Result<(), CatalogError>;

    /// Get or create a term of an attribute.
    async fn ensure_attribute_term(
        &self,
        attribute_slug: &str,
        name: &str,
        slug: &str,
    ) -> Result<TermId, CatalogError>;

    /// Replace the parent's terms for one attribute.
    async fn set_attribute_terms(
        &self,
        id: ProductId,
        attribute_slug: &str,
        terms: &[TermId],
    ) -> Result<(), CatalogError>;

    /// Get or create a category by name.
    async fn ensure_category(&self, name: &str) -> Result<TermId, CatalogError>;

    async fn set_categories(&self, id: ProductId, terms: &[TermId]) -> Result<(), CatalogError>;

    /// Drop every variation of a parent. Returns how many were removed.
    async fn remove_variations(&self, parent: ProductId) -> Result<usize, CatalogError>;

    async fn create_variation(
        &self,
        parent: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError>;

    /// Download the image at `url` and attach it to the product.
    async fn attach_media(&self, id: ProductId, url: &str) -> Result<MediaId, CatalogError>;

    async fn set_featured_media(&self, id: ProductId, media: MediaId) -> Result<(), CatalogError>;

    async fn set_gallery(&self, id: ProductId, media: &[MediaId]) -> Result<(), CatalogError>;

    async fn delete_media(&self, media: MediaId) -> Result<(), CatalogError>;

    /// Re-read a product from storage.
    async fn snapshot(&self, id: ProductId) -> Result<ProductSnapshot, CatalogError>;

    /// Delete a product together with its variations.
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;
}
