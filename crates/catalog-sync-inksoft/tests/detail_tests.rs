use std::sync::Arc;

use catalog_sync::product::{ImageSet, PriceSource};
use catalog_sync::test_support::InMemoryCatalog;
use catalog_sync::{ProductType, RemoteCatalog, RemoteError, SyncError, SyncRunner, SyncSettings};
use catalog_sync_inksoft::{InkSoftClient, InkSoftConfig, InkSoftConnector};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> InkSoftClient {
    InkSoftClient::new(InkSoftConfig {
        store: "acme".into(),
        api_key: "secret".into(),
        base_url: Some(server.uri()),
    })
}

async fn mount_detail(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProduct"))
        .and(query_param("ProductId", "1001"))
        .and(query_param("IncludePricing", "true"))
        .and(query_param("IncludeQuantityPacks", "true"))
        .and(query_param("IncludeCategories", "true"))
        .and(query_param("Format", "JSON"))
        .and(header("x-api-key", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(include_str!("fixtures/product_detail.json"), "application/json"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn detail_decodes_inconsistent_payload() {
    let server = MockServer::start().await;
    mount_detail(&server).await;

    let product = client_for(&server).fetch_detail(1001).await.unwrap();

    assert_eq!(product.title(), "Classic Tee");
    assert_eq!(product.base_price(), (12.0, PriceSource::FirstStylePrice));
    assert_eq!(product.category_names(), vec!["Shirts", "Best Sellers"]);
    assert_eq!(product.supplier.as_deref(), Some("SanMar"));

    let black = &product.styles[0];
    assert_eq!(black.sizes[1].unit_price, None, "blank price should be absent");
    assert_eq!(black.sizes[2].unit_price, Some(15.5));
    assert!(product.styles[1].sides.is_empty(), "null sides should be empty");

    match product.images() {
        ImageSet::Sides(sides) => {
            assert_eq!(sides.len(), 2);
            assert_eq!(sides[0].0, "front");
        }
        other => panic!("expected side images, got {other:?}"),
    }
}

#[tokio::test]
async fn null_detail_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProduct"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"Data":null}"#, "application/json"))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch_detail(42).await;

    assert!(matches!(result, Err(RemoteError::NotFound(42))));
}

#[tokio::test]
async fn chunk_over_http_writes_variable_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .and(query_param("Page", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                include_str!("fixtures/product_list_page0.json"),
                "application/json",
            ),
        )
        .mount(&server)
        .await;
    mount_detail(&server).await;

    let catalog = Arc::new(InMemoryCatalog::new());
    let runner = SyncRunner::new(
        SyncSettings {
            api_key: Some("secret".into()),
            stores: vec!["acme".into()],
            ..Default::default()
        },
        Arc::new(InkSoftConnector::new(Some(server.uri()))),
        catalog.clone(),
        catalog.clone(),
        catalog.clone(),
    );

    let chunk = runner.process_chunk("acme", 0, 3).await;

    assert!(chunk.success);
    assert_eq!(chunk.total_results, 5);
    assert_eq!(chunk.next_page, Some(1));
    // Only 1001 has a detail mock; the other two are skipped, not written.
    assert_eq!(chunk.processed, 1);
    assert!(matches!(
        chunk.outcomes[1].skip_reason,
        Some(SyncError::DetailFetch { id: 1002, .. })
    ));

    let id = catalog.find_sku("TEE-CLASSIC").unwrap();
    let stored = catalog.product(id).unwrap();
    assert_eq!(stored.product_type, Some(ProductType::Variable));
    assert_eq!(stored.price, Some(12.0));

    let variations = catalog.variations(id);
    assert_eq!(variations.len(), 6);
    let xxl = variations
        .iter()
        .find(|v| v.sku == "TEE-CLASSIC-black-xxl")
        .unwrap();
    assert_eq!(xxl.price, 15.5);

    assert_eq!(
        catalog.media_url(stored.featured.unwrap()).as_deref(),
        Some("https://stores.inksoft.com/images/products/1001/black_front.png")
    );
}
