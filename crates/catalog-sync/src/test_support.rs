use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::catalog::{
    Catalog, CatalogError, MediaId, ProductDraft, ProductId, ProductSnapshot, ProductType,
    StockStatus, TermId, VariationDraft, VariationId,
};
use crate::log::LogLine;
use crate::product::{ProductSummary, RemoteProduct, Sku};
use crate::remote::{Connector, ListingPage, RemoteCatalog, RemoteError};
use crate::state::{LogStore, SkuIndex, StateError};

/// Product with one style, one size, a front mockup and a category.
pub fn simple_product(id: i64, sku: &str) -> RemoteProduct {
    product_from(json!({
        "ID": id,
        "Sku": sku,
        "Name": format!("Product {sku}"),
        "LongDescription": format!("<p>About {sku}</p>"),
        "Manufacturer": "Gildan",
        "Categories": [{ "Name": "Shirts" }],
        "Styles": [{
            "Name": "Black",
            "Price": "10.00",
            "Sides": [{ "Side": "front", "ImageFilePath": format!("/images/{sku}-front.png") }],
            "Sizes": [{ "Name": "M" }]
        }]
    }))
}

/// Product with every color offered in every size.
pub fn variable_product(id: i64, sku: &str, colors: &[&str], sizes: &[&str]) -> RemoteProduct {
    let sizes: Vec<_> = sizes.iter().map(|s| json!({ "Name": s })).collect();
    let styles: Vec<_> = colors
        .iter()
        .map(|c| {
            json!({
                "Name": c,
                "Price": "12.50",
                "Sides": [
                    { "Side": "front", "ImageFilePath": format!("/images/{sku}-{c}-front.png") },
                    { "Side": "back", "ImageFilePath": format!("/images/{sku}-{c}-back.png") }
                ],
                "Sizes": sizes
            })
        })
        .collect();

    product_from(json!({
        "ID": id,
        "Sku": sku,
        "Name": format!("Tee {sku}"),
        "Styles": styles
    }))
}

/// Deserialize a product the way the remote client does.
pub fn product_from(value: serde_json::Value) -> RemoteProduct {
    serde_json::from_value(value).expect("fixture product should deserialize")
}

fn summary_of(product: &RemoteProduct) -> ProductSummary {
    ProductSummary {
        id: product.id,
        sku: product.sku.clone(),
        sku_upper: product.sku_upper.clone(),
        name: product.name.clone(),
    }
}

/// In-memory remote store with injectable listing and detail failures.
pub struct InMemoryRemote {
    label: String,
    products: Mutex<Vec<RemoteProduct>>,
    failing_pages: Mutex<HashSet<u32>>,
    failing_details: Mutex<HashSet<i64>>,
    listing_calls: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_products(label, Vec::new())
    }

    pub fn with_products(label: impl Into<String>, products: Vec<RemoteProduct>) -> Self {
        Self {
            label: label.into(),
            products: Mutex::new(products),
            failing_pages: Mutex::new(HashSet::new()),
            failing_details: Mutex::new(HashSet::new()),
            listing_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, product: RemoteProduct) {
        self.products.lock().unwrap().push(product);
    }

    pub fn remove(&self, id: i64) {
        self.products.lock().unwrap().retain(|p| p.id != id);
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().insert(page);
    }

    pub fn fail_detail(&self, id: i64) {
        self.failing_details.lock().unwrap().insert(id);
    }

    /// Clear every injected failure.
    pub fn heal(&self) {
        self.failing_pages.lock().unwrap().clear();
        self.failing_details.lock().unwrap().clear();
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RemoteCatalog for InMemoryRemote {
    fn label(&self) -> &str {
        &self.label
    }

    async fn check(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, RemoteError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(RemoteError::Transport("simulated outage".into()));
        }

        let products = self.products.lock().unwrap();
        let items = products
            .iter()
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .map(summary_of)
            .collect();

        Ok(ListingPage::new(
            items,
            Some(products.len() as u64),
            page,
            page_size,
        ))
    }

    async fn fetch_detail(&self, id: i64) -> Result<RemoteProduct, RemoteError> {
        if self.failing_details.lock().unwrap().contains(&id) {
            return Err(RemoteError::Transport("simulated detail failure".into()));
        }

        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(RemoteError::NotFound(id))
    }
}

/// Hands out registered in-memory remotes by store URI.
#[derive(Default)]
pub struct InMemoryConnector {
    remotes: Mutex<HashMap<String, Arc<InMemoryRemote>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, store: impl Into<String>, remote: Arc<InMemoryRemote>) {
        self.remotes.lock().unwrap().insert(store.into(), remote);
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self, store: &str, _api_key: &str) -> Arc<dyn RemoteCatalog> {
        self.remotes
            .lock()
            .unwrap()
            .entry(store.to_owned())
            .or_insert_with(|| Arc::new(InMemoryRemote::new(store)))
            .clone()
    }
}

/// A product as the in-memory catalog stores it.
#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub draft: ProductDraft,
    pub price: Option<f64>,
    pub product_type: Option<ProductType>,
    pub stock: Option<(StockStatus, i64)>,
    pub meta: BTreeMap<String, String>,
    pub attribute_terms: BTreeMap<String, Vec<TermId>>,
    pub categories: Vec<TermId>,
    pub featured: Option<MediaId>,
    pub gallery: Vec<MediaId>,
}

#[derive(Default)]
struct CatalogState {
    next_id: i64,
    products: BTreeMap<ProductId, StoredProduct>,
    variations: BTreeMap<VariationId, (ProductId, VariationDraft)>,
    attributes: BTreeMap<String, String>,
    terms: BTreeMap<(String, String), TermId>,
    categories: BTreeMap<String, TermId>,
    media: BTreeMap<MediaId, (ProductId, String)>,
    index: BTreeMap<String, BTreeMap<Sku, ProductId>>,
    logs: BTreeMap<String, Vec<String>>,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut StoredProduct, CatalogError> {
        self.products.get_mut(&id).ok_or(CatalogError::NotFound(id))
    }
}

/// In-memory destination catalog. Also serves as SKU index and log store.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
    failing_creates: Mutex<HashSet<String>>,
    failing_media: Mutex<bool>,
    failing_deletes: Mutex<HashSet<ProductId>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creation of the product with this SKU.
    pub fn fail_create(&self, sku: &str) {
        self.failing_creates.lock().unwrap().insert(sku.to_owned());
    }

    /// Reject every media download.
    pub fn fail_media(&self) {
        *self.failing_media.lock().unwrap() = true;
    }

    pub fn fail_delete(&self, id: ProductId) {
        self.failing_deletes.lock().unwrap().insert(id);
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    pub fn product(&self, id: ProductId) -> Option<StoredProduct> {
        self.state.lock().unwrap().products.get(&id).cloned()
    }

    pub fn find_sku(&self, sku: &str) -> Option<ProductId> {
        self.state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|(_, p)| p.draft.sku.as_str() == sku)
            .map(|(id, _)| *id)
    }

    pub fn variations(&self, parent: ProductId) -> Vec<VariationDraft> {
        self.state
            .lock()
            .unwrap()
            .variations
            .values()
            .filter(|(p, _)| *p == parent)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn media_url(&self, media: MediaId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .media
            .get(&media)
            .map(|(_, url)| url.clone())
    }

    pub fn media_count(&self) -> usize {
        self.state.lock().unwrap().media.len()
    }

    pub fn category_names(&self) -> Vec<String> {
        self.state.lock().unwrap().categories.keys().cloned().collect()
    }

    pub fn attribute_label(&self, slug: &str) -> Option<String> {
        self.state.lock().unwrap().attributes.get(slug).cloned()
    }
}

#[async_trait::async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductId>, CatalogError> {
        Ok(self.find_sku(sku.as_str()))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError> {
        if self.failing_creates.lock().unwrap().contains(draft.sku.as_str()) {
            return Err(CatalogError::Write(format!("duplicate SKU {}", draft.sku)));
        }

        let mut state = self.state.lock().unwrap();
        let id = ProductId(state.next_id());
        state.products.insert(
            id,
            StoredProduct {
                draft: draft.clone(),
                price: None,
                product_type: None,
                stock: None,
                meta: BTreeMap::new(),
                attribute_terms: BTreeMap::new(),
                categories: Vec::new(),
                featured: None,
                gallery: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.draft = draft.clone();
        Ok(())
    }

    async fn set_price(&self, id: ProductId, price: f64) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.price = Some(price);
        Ok(())
    }

    async fn set_product_type(&self, id: ProductId, kind: ProductType) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.product_type = Some(kind);
        Ok(())
    }

    async fn set_stock(
        &self,
        id: ProductId,
        status: StockStatus,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.stock = Some((status, quantity));
        Ok(())
    }

    async fn set_meta(&self, id: ProductId, key: &str, value: &str) -> Result<(), CatalogError> {
        self.state
            .lock()
            .unwrap()
            .product_mut(id)?
            .meta
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn ensure_attribute(&self, slug: &str, label: &str) -> Result<(), CatalogError> {
        self.state
            .lock()
            .unwrap()
            .attributes
            .entry(slug.to_owned())
            .or_insert_with(|| label.to_owned());
        Ok(())
    }

    async fn ensure_attribute_term(
        &self,
        attribute_slug: &str,
        _name: &str,
        slug: &str,
    ) -> Result<TermId, CatalogError> {
        let mut state = self.state.lock().unwrap();
        let key = (attribute_slug.to_owned(), slug.to_owned());
        if let Some(term) = state.terms.get(&key) {
            return Ok(*term);
        }
        let term = TermId(state.next_id());
        state.terms.insert(key, term);
        Ok(term)
    }

    async fn set_attribute_terms(
        &self,
        id: ProductId,
        attribute_slug: &str,
        terms: &[TermId],
    ) -> Result<(), CatalogError> {
        self.state
            .lock()
            .unwrap()
            .product_mut(id)?
            .attribute_terms
            .insert(attribute_slug.to_owned(), terms.to_vec());
        Ok(())
    }

    async fn ensure_category(&self, name: &str) -> Result<TermId, CatalogError> {
        let mut state = self.state.lock().unwrap();
        if let Some(term) = state.categories.get(name) {
            return Ok(*term);
        }
        let term = TermId(state.next_id());
        state.categories.insert(name.to_owned(), term);
        Ok(term)
    }

    async fn set_categories(&self, id: ProductId, terms: &[TermId]) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.categories = terms.to_vec();
        Ok(())
    }

    async fn remove_variations(&self, parent: ProductId) -> Result<usize, CatalogError> {
        let mut state = self.state.lock().unwrap();
        let before = state.variations.len();
        state.variations.retain(|_, (p, _)| *p != parent);
        Ok(before - state.variations.len())
    }

    async fn create_variation(
        &self,
        parent: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError> {
        let mut state = self.state.lock().unwrap();
        state.product_mut(parent)?;
        let id = VariationId(state.next_id());
        state.variations.insert(id, (parent, draft.clone()));
        Ok(id)
    }

    async fn attach_media(&self, id: ProductId, url: &str) -> Result<MediaId, CatalogError> {
        if *self.failing_media.lock().unwrap() {
            return Err(CatalogError::Write(format!("download failed: {url}")));
        }

        let mut state = self.state.lock().unwrap();
        state.product_mut(id)?;
        let media = MediaId(state.next_id());
        state.media.insert(media, (id, url.to_owned()));
        Ok(media)
    }

    async fn set_featured_media(&self, id: ProductId, media: MediaId) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.featured = Some(media);
        Ok(())
    }

    async fn set_gallery(&self, id: ProductId, media: &[MediaId]) -> Result<(), CatalogError> {
        self.state.lock().unwrap().product_mut(id)?.gallery = media.to_vec();
        Ok(())
    }

    async fn delete_media(&self, media: MediaId) -> Result<(), CatalogError> {
        self.state.lock().unwrap().media.remove(&media);
        Ok(())
    }

    async fn snapshot(&self, id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        let state = self.state.lock().unwrap();
        let product = state.products.get(&id).ok_or(CatalogError::NotFound(id))?;
        Ok(ProductSnapshot {
            id,
            sku: product.draft.sku.clone(),
            product_type: product.product_type,
            variation_count: state.variations.values().filter(|(p, _)| *p == id).count(),
            featured_media: product.featured,
            gallery: product.gallery.clone(),
        })
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.failing_deletes.lock().unwrap().contains(&id) {
            return Err(CatalogError::Write(format!("product {id} is locked")));
        }

        let mut state = self.state.lock().unwrap();
        state.products.remove(&id).ok_or(CatalogError::NotFound(id))?;
        state.variations.retain(|_, (p, _)| *p != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SkuIndex for InMemoryCatalog {
    async fn record(&self, store: &str, sku: &Sku, id: ProductId) -> Result<(), StateError> {
        self.state
            .lock()
            .unwrap()
            .index
            .entry(store.to_owned())
            .or_default()
            .insert(sku.clone(), id);
        Ok(())
    }

    async fn entries(&self, store: &str) -> Result<BTreeMap<Sku, ProductId>, StateError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .index
            .get(store)
            .cloned()
            .unwrap_or_default())
    }

    async fn forget(&self, store: &str, sku: &Sku) -> Result<(), StateError> {
        if let Some(entries) = self.state.lock().unwrap().index.get_mut(store) {
            entries.remove(sku);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LogStore for InMemoryCatalog {
    async fn append(&self, store: &str, lines: &[LogLine]) -> Result<(), StateError> {
        self.state
            .lock()
            .unwrap()
            .logs
            .entry(store.to_owned())
            .or_default()
            .extend(lines.iter().map(ToString::to_string));
        Ok(())
    }

    async fn lines(&self, store: &str) -> Result<Vec<String>, StateError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .logs
            .get(store)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, store: &str) -> Result<(), StateError> {
        self.state.lock().unwrap().logs.remove(store);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remote_pages_through_products() {
        let remote = InMemoryRemote::with_products(
            "test",
            (1..=3).map(|i| simple_product(i, &format!("S{i}"))).collect(),
        );

        let first = remote.fetch_page(0, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);

        let all = remote.fetch_all(2).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn injected_page_failure_breaks_full_enumeration() {
        let remote = InMemoryRemote::with_products(
            "test",
            (1..=3).map(|i| simple_product(i, &format!("S{i}"))).collect(),
        );
        remote.fail_page(1);

        assert!(remote.fetch_all(2).await.is_err());
    }

    #[test]
    fn fixtures_deserialize_lenient_fields() {
        let product = simple_product(4, "ABC");
        assert_eq!(product.styles[0].price, Some(10.0));
        assert_eq!(product.category_names(), vec!["Shirts"]);

        let tee = variable_product(5, "TEE", &["Red", "Blue"], &["S", "M", "L"]);
        assert_eq!(tee.styles.len(), 2);
        assert_eq!(tee.styles[1].sizes.len(), 3);
    }
}
