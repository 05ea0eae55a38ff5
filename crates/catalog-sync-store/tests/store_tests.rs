use catalog_sync::{
    Catalog, CatalogError, LogLine, LogStore, ProductDraft, ProductId, ProductType, Sku, SkuIndex,
    StockStatus, VariationDraft,
};
use catalog_sync_store::{CatalogStore, LOG_RETENTION_SECS};

fn create_store() -> CatalogStore {
    CatalogStore::open_in_memory().unwrap()
}

fn draft(sku: &str, title: &str) -> ProductDraft {
    ProductDraft {
        sku: Sku::new(sku),
        title: title.to_owned(),
        body: format!("About {title}"),
        excerpt: String::new(),
    }
}

fn variation(sku: &str, price: f64) -> VariationDraft {
    VariationDraft {
        sku: sku.to_owned(),
        title: sku.to_owned(),
        price,
        stock_status: StockStatus::InStock,
        stock_quantity: 999,
        attributes: vec![("pa_size".to_owned(), "m".to_owned())],
    }
}

#[tokio::test]
async fn find_by_sku_after_create() {
    let store = create_store();

    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();

    assert_eq!(store.find_by_sku(&Sku::new("TEE")).await.unwrap(), Some(id));
    assert_eq!(store.find_by_sku(&Sku::new("MUG")).await.unwrap(), None);
}

#[tokio::test]
async fn duplicate_sku_is_rejected() {
    let store = create_store();
    store.create_product(&draft("TEE", "Tee")).await.unwrap();

    let result = store.create_product(&draft("TEE", "Other")).await;

    assert!(result.is_err());
    assert_eq!(store.product_count().unwrap(), 1);
}

#[tokio::test]
async fn update_rewrites_content() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();

    store.update_product(id, &draft("TEE", "Renamed")).await.unwrap();

    assert_eq!(store.product(id).unwrap().unwrap().title, "Renamed");
}

#[tokio::test]
async fn writes_to_missing_product_are_not_found() {
    let store = create_store();

    let result = store.set_price(ProductId(99), 10.0).await;

    assert!(matches!(result, Err(CatalogError::NotFound(ProductId(99)))));
}

#[tokio::test]
async fn snapshot_reflects_type_and_variations() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();
    store.set_product_type(id, ProductType::Variable).await.unwrap();
    store.create_variation(id, &variation("TEE-s", 10.0)).await.unwrap();
    store.create_variation(id, &variation("TEE-m", 10.0)).await.unwrap();

    let snapshot = store.snapshot(id).await.unwrap();

    assert_eq!(snapshot.product_type, Some(ProductType::Variable));
    assert_eq!(snapshot.variation_count, 2);
    assert_eq!(snapshot.sku, Sku::new("TEE"));
}

#[tokio::test]
async fn remove_variations_reports_count() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();
    store.create_variation(id, &variation("TEE-s", 10.0)).await.unwrap();

    assert_eq!(store.remove_variations(id).await.unwrap(), 1);
    assert_eq!(store.remove_variations(id).await.unwrap(), 0);
    assert!(store.variations(id).unwrap().is_empty());
}

#[tokio::test]
async fn variation_attributes_survive_storage() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();
    store.create_variation(id, &variation("TEE-m", 12.5)).await.unwrap();

    let stored = store.variations(id).unwrap();

    assert_eq!(stored, vec![variation("TEE-m", 12.5)]);
}

#[tokio::test]
async fn categories_are_shared_and_ordered() {
    let store = create_store();
    let a = store.create_product(&draft("A", "A")).await.unwrap();
    let b = store.create_product(&draft("B", "B")).await.unwrap();

    let shirts = store.ensure_category("Shirts").await.unwrap();
    let sale = store.ensure_category("On Sale").await.unwrap();
    assert_eq!(store.ensure_category("Shirts").await.unwrap(), shirts);

    store.set_categories(a, &[sale, shirts]).await.unwrap();
    store.set_categories(b, &[shirts]).await.unwrap();

    assert_eq!(store.product_categories(a).unwrap(), vec!["On Sale", "Shirts"]);
    assert_eq!(store.product_categories(b).unwrap(), vec!["Shirts"]);
}

#[tokio::test]
async fn attribute_terms_are_reused_per_attribute() {
    let store = create_store();

    let red = store.ensure_attribute_term("pa_color", "Red", "red").await.unwrap();
    let again = store.ensure_attribute_term("pa_color", "Red", "red").await.unwrap();
    let size = store.ensure_attribute_term("pa_size", "Red", "red").await.unwrap();

    assert_eq!(red, again);
    assert_ne!(red, size);
}

#[tokio::test]
async fn meta_upserts_by_key() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();

    store.set_meta(id, "supplier", "SanMar").await.unwrap();
    store.set_meta(id, "supplier", "alphabroder").await.unwrap();

    assert_eq!(store.meta(id, "supplier").unwrap().as_deref(), Some("alphabroder"));
}

#[tokio::test]
async fn delete_product_drops_variations_and_media() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();
    store.create_variation(id, &variation("TEE-s", 10.0)).await.unwrap();
    let media = store.attach_media(id, "https://x/a.png").await.unwrap();

    store.delete_product(id).await.unwrap();

    assert_eq!(store.product_count().unwrap(), 0);
    assert!(store.variations(id).unwrap().is_empty());
    assert_eq!(store.media_url(media).unwrap(), None);
    assert!(matches!(
        store.delete_product(id).await,
        Err(CatalogError::NotFound(_))
    ));
}

#[tokio::test]
async fn featured_and_gallery_round_into_snapshot() {
    let store = create_store();
    let id = store.create_product(&draft("TEE", "Tee")).await.unwrap();
    assert_eq!(store.snapshot(id).await.unwrap().featured_media, None);

    let front = store.attach_media(id, "https://x/front.png").await.unwrap();
    let back = store.attach_media(id, "https://x/back.png").await.unwrap();
    store.set_featured_media(id, front).await.unwrap();
    store.set_gallery(id, &[back]).await.unwrap();

    let snapshot = store.snapshot(id).await.unwrap();
    assert_eq!(snapshot.featured_media, Some(front));
    assert_eq!(snapshot.gallery, vec![back]);
}

#[tokio::test]
async fn sku_index_is_scoped_per_store() {
    let store = create_store();

    store.record("acme", &Sku::new("A"), ProductId(1)).await.unwrap();
    store.record("acme", &Sku::new("B"), ProductId(2)).await.unwrap();
    store.record("globex", &Sku::new("A"), ProductId(3)).await.unwrap();
    store.record("acme", &Sku::new("A"), ProductId(4)).await.unwrap();
    store.forget("acme", &Sku::new("B")).await.unwrap();

    let acme = store.entries("acme").await.unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[&Sku::new("A")], ProductId(4));
    assert_eq!(store.entries("globex").await.unwrap().len(), 1);
}

#[tokio::test]
async fn log_lines_accumulate_in_order() {
    let store = create_store();

    store.append("acme", &[LogLine::info("one"), LogLine::warning("two")]).await.unwrap();
    store.append("acme", &[LogLine::error("three")]).await.unwrap();
    store.append("globex", &[LogLine::info("elsewhere")]).await.unwrap();

    assert_eq!(
        store.lines("acme").await.unwrap(),
        vec!["one", "[WARNING] two", "[ERROR] three"]
    );

    store.clear("acme").await.unwrap();
    assert!(store.lines("acme").await.unwrap().is_empty());
    assert_eq!(store.lines("globex").await.unwrap().len(), 1);
}

#[tokio::test]
async fn log_lines_expire_after_retention() {
    let store = create_store();
    store.append("acme", &[LogLine::info("old")]).await.unwrap();
    store.backdate_logs("acme", LOG_RETENTION_SECS + 1).unwrap();
    store.append("acme", &[LogLine::info("new")]).await.unwrap();

    assert_eq!(store.lines("acme").await.unwrap(), vec!["new"]);
}

#[tokio::test]
async fn store_persists_across_reopen() {
    let dir = std::env::temp_dir().join(format!("catalog-sync-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("catalog.db");
    let _ = std::fs::remove_file(&path);

    {
        let store = CatalogStore::open(&path).unwrap();
        store.create_product(&draft("TEE", "Tee")).await.unwrap();
    }

    let reopened = CatalogStore::open(&path).unwrap();
    assert!(reopened.find_by_sku(&Sku::new("TEE")).await.unwrap().is_some());

    let _ = std::fs::remove_dir_all(&dir);
}
