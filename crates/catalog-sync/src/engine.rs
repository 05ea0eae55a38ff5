//! Per-page reconciliation of remote products into the destination catalog,
//! and the pruning sweep.
//!
//! Each product moves through fetch, upsert, classification, variation
//! rewrite, media and taxonomy sync, and tracking. Only two failures drop a
//! product: its detail fetch, and its creation. Every other step is recorded
//! in the product's outcome and the pipeline carries on.

use std::collections::HashSet;
use std::fmt;

use crate::axis::{AxisConfig, AxisPath};
use crate::catalog::{
    Catalog, CatalogError, ProductDraft, ProductId, ProductType, StockStatus, VariationDraft,
};
use crate::classify::classify;
use crate::error::SyncError;
use crate::log::RunLog;
use crate::mapper::{
    AttributeValue, attribute_meta_for, cartesian_product, extract_axis_values,
    price_for_combination, sku_for, title_for,
};
use crate::outcome::{Field, ProductAction, ProductOutcome, PruneReport};
use crate::pricing::{apply_markup, format_price};
use crate::product::{ImageSet, RemoteProduct, Sku};
use crate::remote::RemoteCatalog;
use crate::settings::SyncSettings;
use crate::state::SkuIndex;

/// Numbers from one synced page; the caller attaches the log.
#[derive(Debug)]
pub struct PageReport {
    pub processed: usize,
    pub total_results: u64,
    pub next_page: Option<u32>,
    pub outcomes: Vec<ProductOutcome>,
}

/// Drives destination writes for one store.
///
/// Products are processed strictly one after another in listing order; the
/// destination is assumed to have a single writer.
pub struct Reconciler<'a> {
    settings: &'a SyncSettings,
    catalog: &'a dyn Catalog,
    index: &'a dyn SkuIndex,
    axes: Vec<AxisConfig>,
}

impl<'a> Reconciler<'a> {
    pub fn new(settings: &'a SyncSettings, catalog: &'a dyn Catalog, index: &'a dyn SkuIndex) -> Self {
        Self {
            settings,
            catalog,
            index,
            axes: settings.axes(),
        }
    }

    /// Sync one listing page.
    ///
    /// A listing failure is returned as an error and nothing is written; the
    /// caller keeps its cursor and may retry the same page.
    pub async fn sync_page(
        &self,
        remote: &dyn RemoteCatalog,
        store: &str,
        page: u32,
        page_size: u32,
        log: &mut RunLog,
    ) -> Result<PageReport, SyncError> {
        log.debug(format!("Calling listing API for {}", remote.label()));

        let listing = match remote.fetch_page(page, page_size).await {
            Ok(listing) => listing,
            Err(e) => {
                let err = SyncError::from(e);
                log.error(format!("API request failed: {err}"));
                return Err(err);
            }
        };

        log.debug(format!(
            "API response received - product count: {}, total results: {}",
            listing.items.len(),
            listing.total_results
        ));

        let mut outcomes = Vec::with_capacity(listing.items.len());
        for summary in &listing.items {
            log.debug(format!("Processing product ID: {}", summary.id));
            outcomes.push(self.sync_product(remote, store, summary.id, log).await);
        }

        let processed = outcomes.iter().filter(|o| o.succeeded()).count();
        log.info(format!(
            "Page {page}: {processed} of {} product(s) synced",
            listing.items.len()
        ));

        Ok(PageReport {
            processed,
            total_results: listing.total_results,
            next_page: listing.next_page(page),
            outcomes,
        })
    }

    /// Fetch one product's detail and reconcile it.
    ///
    /// A failed detail fetch skips the product; it is never written from the
    /// listing summary alone.
    pub async fn sync_product(
        &self,
        remote: &dyn RemoteCatalog,
        store: &str,
        id: i64,
        log: &mut RunLog,
    ) -> ProductOutcome {
        log.debug(format!("Fetching detailed product data for ID: {id}"));

        match remote.fetch_detail(id).await {
            Ok(product) => self.reconcile(store, &product, log).await,
            Err(e) => {
                log.warning(format!(
                    "Could not fetch detailed product info for ID: {id} ({e})"
                ));
                ProductOutcome::new(id).skipped(SyncError::DetailFetch {
                    id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write one fully fetched product into the destination.
    pub async fn reconcile(
        &self,
        store: &str,
        product: &RemoteProduct,
        log: &mut RunLog,
    ) -> ProductOutcome {
        let mut outcome = ProductOutcome::new(product.id);
        let sku = product.resolve_sku(&self.settings.sku_prefix);
        outcome.sku = Some(sku.clone());

        let (base, source) = product.base_price();
        let price = apply_markup(base, self.settings.markup_percent);
        log.debug(format!(
            "Price: {} (source: {source}, markup: {}%)",
            format_price(price),
            self.settings.markup_percent
        ));

        let draft = ProductDraft {
            sku: sku.clone(),
            title: product.title(),
            body: product.body(),
            excerpt: product.excerpt(),
        };

        let id = match self.upsert(&draft, &mut outcome, log).await {
            Ok(id) => id,
            Err(err) => return outcome.skipped(err),
        };
        outcome.product_id = Some(id);

        let result = self.catalog.set_price(id, price).await;
        if settle(&mut outcome, log, Field::Price, result).is_some() {
            log.debug(format!("Price set: {}", format_price(price)));
        }

        let result = self.write_provenance(id, product.id, store).await;
        settle(&mut outcome, log, Field::Provenance, result);

        let classification = classify(product, log);
        let kind = if classification.is_variable {
            ProductType::Variable
        } else {
            ProductType::Simple
        };
        log.debug(format!(
            "Product classified as {} ({})",
            kind.as_str().to_uppercase(),
            classification.reason
        ));

        let result = self.catalog.set_product_type(id, kind).await;
        if settle(&mut outcome, log, Field::ProductType, result).is_some() {
            log.debug(format!("Product type set to: {kind}"));
        }

        if classification.is_variable {
            let result = self.write_variations(id, &sku, product, price, log).await;
            if let Some(written) = settle(&mut outcome, log, Field::Variations, result) {
                outcome.variations_written = written;
            }
        }
        outcome.classification = Some(classification);

        let result = self
            .catalog
            .set_stock(id, StockStatus::InStock, self.settings.stock_quantity)
            .await;
        settle(&mut outcome, log, Field::Stock, result);

        if let Some(manufacturer) = &product.manufacturer {
            let result = self.catalog.set_meta(id, "manufacturer", manufacturer).await;
            if settle(&mut outcome, log, Field::Manufacturer, result).is_some() {
                log.debug(format!("Manufacturer set: {manufacturer}"));
            }
        }

        if let Some(supplier) = &product.supplier {
            let result = self.catalog.set_meta(id, "supplier", supplier).await;
            if settle(&mut outcome, log, Field::Supplier, result).is_some() {
                log.debug(format!("Supplier set: {supplier}"));
            }
        }

        let result = self.sync_categories(id, product, log).await;
        settle(&mut outcome, log, Field::Categories, result);

        let result = self.sync_images(id, product, log).await;
        settle(&mut outcome, log, Field::Images, result);

        let result = self.verify(id, log).await;
        settle(&mut outcome, log, Field::Verification, result);

        let result = self.index.record(store, &sku, id).await;
        settle(&mut outcome, log, Field::Tracking, result);

        outcome
    }

    async fn upsert(
        &self,
        draft: &ProductDraft,
        outcome: &mut ProductOutcome,
        log: &mut RunLog,
    ) -> Result<ProductId, SyncError> {
        let existing = match self.catalog.find_by_sku(&draft.sku).await {
            Ok(existing) => existing,
            Err(e) => {
                log.error(format!("Failed to look up product SKU={}: {e}", draft.sku));
                return Err(SyncError::Write(e.to_string()));
            }
        };

        match existing {
            Some(id) => {
                outcome.action = ProductAction::Updated;
                let result = self.catalog.update_product(id, draft).await;
                if settle(outcome, log, Field::Content, result).is_some() {
                    log.info(format!("Updated product SKU={} (ID={id})", draft.sku));
                }
                Ok(id)
            }
            None => match self.catalog.create_product(draft).await {
                Ok(id) => {
                    outcome.action = ProductAction::Created;
                    outcome.record(Field::Content, Ok(()));
                    log.info(format!("Created product SKU={} (ID={id})", draft.sku));
                    Ok(id)
                }
                Err(e) => {
                    log.error(format!("Failed to create product SKU={}: {e}", draft.sku));
                    Err(SyncError::Write(e.to_string()))
                }
            },
        }
    }

    async fn write_provenance(
        &self,
        id: ProductId,
        remote_id: i64,
        store: &str,
    ) -> Result<(), CatalogError> {
        self.catalog
            .set_meta(id, "inksoft_product_id", &remote_id.to_string())
            .await?;
        self.catalog.set_meta(id, "inksoft_store_uri", store).await
    }

    /// Register axes, assign their terms to the parent, and rewrite the
    /// full variation set. Returns the number of variations written.
    async fn write_variations(
        &self,
        parent: ProductId,
        base_sku: &Sku,
        product: &RemoteProduct,
        base_price: f64,
        log: &mut RunLog,
    ) -> Result<usize, String> {
        if self.axes.is_empty() {
            return Err("no attribute axes configured".into());
        }
        log.debug(format!(
            "Creating variations with {} attribute axes",
            self.axes.len()
        ));

        for axis in self.axes.iter().filter(|a| !a.attribute_slug.is_empty()) {
            if let Err(e) = self
                .catalog
                .ensure_attribute(&axis.attribute_slug, &axis.label)
                .await
            {
                log.warning(format!(
                    "Failed to register attribute {}: {e}",
                    axis.attribute_slug
                ));
            }
        }

        let mut axis_values = Vec::new();
        let mut contributing = Vec::new();
        for axis in &self.axes {
            if axis.axis_path() == AxisPath::Unsupported {
                log.warning(format!(
                    "Attribute '{}' has unsupported path '{}'",
                    axis.key, axis.path
                ));
                continue;
            }

            let values = extract_axis_values(product, &axis.path);
            if values.is_empty() {
                log.debug(format!("Attribute '{}': no values", axis.key));
                continue;
            }

            log.debug(format!("Attribute '{}': {} values", axis.key, values.len()));
            self.assign_axis_terms(parent, axis, &values, log).await;
            axis_values.push(values);
            contributing.push(axis.clone());
        }

        if axis_values.is_empty() {
            return Err("could not extract attribute values from product".into());
        }

        let combinations = cartesian_product(&axis_values);
        log.debug(format!(
            "Generated {} variation combinations",
            combinations.len()
        ));

        match self.catalog.remove_variations(parent).await {
            Ok(0) => {}
            Ok(removed) => log.debug(format!("Removed {removed} previous variation(s)")),
            Err(e) => log.warning(format!("Failed to remove previous variations: {e}")),
        }

        let title = product.title();
        let mut written = 0;
        for combination in &combinations {
            let draft = VariationDraft {
                sku: sku_for(base_sku.as_str(), combination),
                title: title_for(&title, combination),
                price: price_for_combination(combination, base_price),
                stock_status: StockStatus::InStock,
                stock_quantity: self.settings.stock_quantity,
                attributes: attribute_meta_for(combination, &contributing),
            };

            match self.catalog.create_variation(parent, &draft).await {
                Ok(_) => written += 1,
                Err(e) => log.error(format!("Failed to create variation {}: {e}", draft.title)),
            }
        }

        log.info(format!(
            "Created {written} of {} variations",
            combinations.len()
        ));
        Ok(written)
    }

    async fn assign_axis_terms(
        &self,
        parent: ProductId,
        axis: &AxisConfig,
        values: &[AttributeValue],
        log: &mut RunLog,
    ) {
        if axis.attribute_slug.is_empty() {
            return;
        }

        let mut terms = Vec::with_capacity(values.len());
        for value in values {
            match self
                .catalog
                .ensure_attribute_term(&axis.attribute_slug, &value.name, &value.slug())
                .await
            {
                Ok(term) => terms.push(term),
                Err(e) => log.warning(format!(
                    "Failed to create term '{}' for {}: {e}",
                    value.name, axis.attribute_slug
                )),
            }
        }

        if terms.is_empty() {
            return;
        }

        match self
            .catalog
            .set_attribute_terms(parent, &axis.attribute_slug, &terms)
            .await
        {
            Ok(()) => log.debug(format!(
                "Set attribute '{}' with {} terms",
                axis.attribute_slug,
                terms.len()
            )),
            Err(e) => log.error(format!(
                "Failed to assign attribute '{}' to parent: {e}",
                axis.attribute_slug
            )),
        }
    }

    async fn sync_categories(
        &self,
        id: ProductId,
        product: &RemoteProduct,
        log: &mut RunLog,
    ) -> Result<(), CatalogError> {
        let names = product.category_names();
        if names.is_empty() {
            return Ok(());
        }

        let mut terms = Vec::with_capacity(names.len());
        for name in &names {
            match self.catalog.ensure_category(name).await {
                Ok(term) => terms.push(term),
                Err(e) => log.warning(format!("Failed to create category '{name}': {e}")),
            }
        }

        if terms.is_empty() {
            return Ok(());
        }

        self.catalog.set_categories(id, &terms).await?;
        log.debug(format!("Assigned {} category term(s)", terms.len()));
        Ok(())
    }

    /// First image becomes the featured image, the rest the gallery.
    async fn sync_images(
        &self,
        id: ProductId,
        product: &RemoteProduct,
        log: &mut RunLog,
    ) -> Result<(), CatalogError> {
        log.debug(format!("Processing images for product {id}"));

        let images = match product.images() {
            ImageSet::Sides(sides) => {
                log.debug(format!("Found {} sides with images", sides.len()));
                sides
            }
            ImageSet::Single(path) => {
                log.debug("Using fallback single image from first style");
                vec![("primary".to_owned(), path)]
            }
            ImageSet::None => Vec::new(),
        };

        if images.is_empty() {
            log.warning(format!("No images found for product {id}"));
            return Ok(());
        }

        let previous = self.catalog.snapshot(id).await?;
        if previous.featured_media.is_some() && !self.settings.replace_images {
            log.debug("Keeping existing images (replace disabled)");
            return Ok(());
        }

        let mut attached = Vec::with_capacity(images.len());
        for (idx, (label, path)) in images.iter().enumerate() {
            let url = self.image_url(path);
            log.debug(format!("Downloading image {idx}: {label} from {url}"));
            match self.catalog.attach_media(id, &url).await {
                Ok(media) => {
                    log.debug(format!("Image {idx} saved with ID={media}"));
                    attached.push(media);
                }
                Err(e) => log.error(format!("Failed to download image {idx}: {url} ({e})")),
            }
        }

        let Some((&featured, gallery)) = attached.split_first() else {
            return Err(CatalogError::Write(format!(
                "none of {} image(s) could be attached",
                images.len()
            )));
        };

        self.catalog.set_featured_media(id, featured).await?;
        if gallery.is_empty() {
            log.debug("Single image set as featured only");
        } else {
            self.catalog.set_gallery(id, gallery).await?;
            log.debug(format!(
                "Set gallery with {} additional images",
                gallery.len()
            ));
        }

        let stale = previous
            .featured_media
            .into_iter()
            .chain(previous.gallery)
            .filter(|old| !attached.contains(old));
        for old in stale {
            if let Err(e) = self.catalog.delete_media(old).await {
                log.warning(format!("Failed to remove previous image {old}: {e}"));
            }
        }

        Ok(())
    }

    fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }

        let base = self.settings.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Re-read the product so the log reflects stored state, not intent.
    async fn verify(&self, id: ProductId, log: &mut RunLog) -> Result<(), CatalogError> {
        let snapshot = self.catalog.snapshot(id).await?;
        let kind = snapshot
            .product_type
            .map(|t| t.as_str())
            .unwrap_or("unknown");
        log.debug(format!(
            "Verified product ID={} | type '{kind}' | variations={}",
            snapshot.id, snapshot.variation_count
        ));
        Ok(())
    }

    /// Delete destination products whose SKUs no longer appear upstream.
    ///
    /// Only tracked SKUs are candidates, and only a complete enumeration of
    /// the remote listing may delete anything.
    pub async fn delete_missing(
        &self,
        remote: &dyn RemoteCatalog,
        store: &str,
        log: &mut RunLog,
    ) -> PruneReport {
        let mut report = PruneReport {
            store: store.to_owned(),
            ..Default::default()
        };

        let tracked = match self.index.entries(store).await {
            Ok(tracked) => tracked,
            Err(e) => {
                log.error(format!("Could not read imported SKUs: {e}"));
                report.aborted = Some(e.into());
                return report;
            }
        };

        if tracked.is_empty() {
            log.debug(format!("No imported products tracked for {store}; nothing to prune"));
            return report;
        }

        let listing = match remote.fetch_all(self.settings.effective_page_size()).await {
            Ok(listing) => listing,
            Err(e) => {
                let err = SyncError::from(e);
                log.error(format!(
                    "Full listing failed, pruning aborted without deletions: {err}"
                ));
                report.aborted = Some(err);
                return report;
            }
        };

        let current: HashSet<Sku> = listing
            .iter()
            .map(|summary| summary.resolve_sku(&self.settings.sku_prefix))
            .collect();
        log.debug(format!(
            "Remote lists {} product(s); {} tracked",
            current.len(),
            tracked.len()
        ));

        for (sku, id) in tracked {
            if current.contains(&sku) {
                report.kept += 1;
                continue;
            }

            match self.catalog.delete_product(id).await {
                Ok(()) | Err(CatalogError::NotFound(_)) => {
                    if let Err(e) = self.index.forget(store, &sku).await {
                        log.warning(format!("Deleted SKU={sku} but could not untrack it: {e}"));
                    }
                    log.info(format!(
                        "Deleted product SKU={sku} (ID={id}), no longer listed upstream"
                    ));
                    report.deleted.push((sku, id));
                }
                Err(e) => {
                    log.error(format!("Failed to delete product SKU={sku} (ID={id}): {e}"));
                    report.failed.push((sku, e.to_string()));
                }
            }
        }

        report
    }
}

/// Record a best-effort step, logging failures. Returns the value on success.
fn settle<T, E: fmt::Display>(
    outcome: &mut ProductOutcome,
    log: &mut RunLog,
    field: Field,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => {
            outcome.record(field, Ok(()));
            Some(value)
        }
        Err(e) => {
            log.error(format!("Failed to write {field}: {e}"));
            outcome.record(field, Err(e.to_string()));
            None
        }
    }
}
