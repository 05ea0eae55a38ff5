use std::sync::Arc;
use std::time::Duration;

use catalog_sync::{
    Connector, ListingPage, ProductSummary, RemoteCatalog, RemoteError, RemoteProduct,
};

use crate::envelope::Envelope;

const DEFAULT_BASE_URL: &str = "https://stores.inksoft.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one InkSoft store.
#[derive(Debug, Clone)]
pub struct InkSoftConfig {
    /// Store URI, the path segment after the host.
    pub store: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

/// Read-only client for a store's `Api2` endpoints.
pub struct InkSoftClient {
    config: InkSoftConfig,
    client: reqwest::Client,
}

impl InkSoftClient {
    pub fn new(config: InkSoftConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("catalog-sync")
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    fn base(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<reqwest::Url, RemoteError> {
        let raw = format!(
            "{}/{}/Api2/{endpoint}",
            self.base(),
            self.config.store.trim_matches('/')
        );

        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| RemoteError::Transport(format!("invalid URL {raw}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())))
            .append_pair("Format", "JSON");

        Ok(url)
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Envelope, RemoteError> {
        let url = self.endpoint_url(endpoint, params)?;
        tracing::debug!(store = %self.config.store, endpoint, "inksoft request");

        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "{endpoint} returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Envelope::parse(&body)
    }
}

#[async_trait::async_trait]
impl RemoteCatalog for InkSoftClient {
    fn label(&self) -> &str {
        &self.config.store
    }

    async fn check(&self) -> Result<(), RemoteError> {
        self.request("GetStoreData", &[]).await.map(|_| ())
    }

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, RemoteError> {
        let envelope = self
            .request(
                "GetProductBaseList",
                &[("Page", page.to_string()), ("PageSize", page_size.to_string())],
            )
            .await?;

        let total = envelope.total_results;
        let items: Vec<ProductSummary> = envelope.items()?;
        Ok(ListingPage::new(items, total, page, page_size))
    }

    async fn fetch_detail(&self, id: i64) -> Result<RemoteProduct, RemoteError> {
        let envelope = self
            .request(
                "GetProduct",
                &[
                    ("ProductId", id.to_string()),
                    ("IncludePricing", "true".into()),
                    ("IncludeQuantityPacks", "true".into()),
                    ("IncludeCategories", "true".into()),
                ],
            )
            .await?;

        envelope.record()?.ok_or(RemoteError::NotFound(id))
    }
}

/// Builds [`InkSoftClient`]s against one host.
#[derive(Debug, Clone, Default)]
pub struct InkSoftConnector {
    base_url: Option<String>,
}

impl InkSoftConnector {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }
}

impl Connector for InkSoftConnector {
    fn connect(&self, store: &str, api_key: &str) -> Arc<dyn RemoteCatalog> {
        Arc::new(InkSoftClient::new(InkSoftConfig {
            store: store.to_owned(),
            api_key: api_key.to_owned(),
            base_url: self.base_url.clone(),
        }))
    }
}
