use catalog_sync::test_support::InMemoryCatalog;
use catalog_sync::{
    Catalog, ProductDraft, Reconciler, RemoteCatalog, RemoteError, RunLog, Sku, SkuIndex,
    SyncError, SyncSettings,
};
use catalog_sync_inksoft::{InkSoftClient, InkSoftConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> InkSoftClient {
    InkSoftClient::new(InkSoftConfig {
        store: "acme".into(),
        api_key: "secret".into(),
        base_url: Some(server.uri()),
    })
}

async fn mount_page(server: &MockServer, page: &str, fixture: &'static str) {
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .and(query_param("Page", page))
        .and(query_param("PageSize", "3"))
        .and(query_param("Format", "JSON"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(fixture, "application/json"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_page_reports_total_and_more() {
    let server = MockServer::start().await;
    mount_page(&server, "0", include_str!("fixtures/product_list_page0.json")).await;

    let page = client_for(&server).fetch_page(0, 3).await.unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total_results, 5);
    assert!(page.has_more);
    assert_eq!(page.next_page(0), Some(1));
}

#[tokio::test]
async fn listing_skus_resolve_through_fallbacks() {
    let server = MockServer::start().await;
    mount_page(&server, "0", include_str!("fixtures/product_list_page0.json")).await;

    let page = client_for(&server).fetch_page(0, 3).await.unwrap();
    let skus: Vec<Sku> = page.items.iter().map(|s| s.resolve_sku("inksoft")).collect();

    assert_eq!(
        skus,
        vec![
            Sku::new("TEE-CLASSIC"),
            Sku::new("HOODIE-ZIP"),
            Sku::new("inksoft-1003"),
        ]
    );
    assert_eq!(page.items[1].id, 1002, "string IDs should parse");
}

#[tokio::test]
async fn fetch_all_walks_every_page() {
    let server = MockServer::start().await;
    mount_page(&server, "0", include_str!("fixtures/product_list_page0.json")).await;
    mount_page(&server, "1", include_str!("fixtures/product_list_page1.json")).await;

    let all = client_for(&server).fetch_all(3).await.unwrap();

    let ids: Vec<i64> = all.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003, 1004, 1005]);
}

#[tokio::test]
async fn fetch_all_fails_as_a_whole_when_a_page_fails() {
    let server = MockServer::start().await;
    mount_page(&server, "0", include_str!("fixtures/product_list_page0.json")).await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .and(query_param("Page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch_all(3).await;

    assert!(matches!(result, Err(RemoteError::Transport(_))));
}

#[tokio::test]
async fn server_error_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch_page(0, 3).await;

    assert!(matches!(result, Err(RemoteError::Transport(msg)) if msg.contains("500")));
}

#[tokio::test]
async fn garbage_body_is_a_payload_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch_page(0, 3).await;

    assert!(matches!(result, Err(RemoteError::Payload(_))));
}

#[tokio::test]
async fn check_calls_store_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetStoreData"))
        .and(header("x-api-key", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(include_str!("fixtures/store_data.json"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).check().await.unwrap();
}

#[tokio::test]
async fn rejected_key_fails_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetStoreData"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(include_str!("fixtures/rejected.json"), "application/json"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).check().await.unwrap_err();

    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn fetch_all_rejects_a_listing_that_runs_dry() {
    let server = MockServer::start().await;
    mount_page(&server, "0", include_str!("fixtures/product_list_page0.json")).await;
    mount_page(
        &server,
        "1",
        r#"{"Data":[],"Pagination":{"TotalResults":5}}"#,
    )
    .await;

    let result = client_for(&server).fetch_all(3).await;

    assert!(matches!(result, Err(RemoteError::Payload(msg)) if msg.contains("3 of 5")));
}

#[tokio::test]
async fn unexpected_listing_shape_never_prunes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/Api2/GetProductBaseList"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"Message":"Store temporarily unavailable"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let catalog = InMemoryCatalog::new();
    for sku in ["A", "B", "C"] {
        let draft = ProductDraft {
            sku: Sku::new(sku),
            title: sku.into(),
            body: String::new(),
            excerpt: String::new(),
        };
        let id = catalog.create_product(&draft).await.unwrap();
        catalog.record("acme", &draft.sku, id).await.unwrap();
    }

    let settings = SyncSettings {
        page_size: 3,
        ..Default::default()
    };
    let reconciler = Reconciler::new(&settings, &catalog, &catalog);
    let mut log = RunLog::new("acme");
    let report = reconciler
        .delete_missing(&client_for(&server), "acme", &mut log)
        .await;

    assert!(matches!(report.aborted, Some(SyncError::Payload(_))));
    assert!(report.deleted.is_empty());
    assert_eq!(catalog.product_count(), 3);
    assert_eq!(catalog.entries("acme").await.unwrap().len(), 3);
}
