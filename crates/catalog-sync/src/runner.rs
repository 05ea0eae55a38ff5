use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::engine::Reconciler;
use crate::error::SyncError;
use crate::log::{LogLine, RunLog};
use crate::outcome::{ListedProduct, PruneReport, RunSummary, SingleProductResult, SyncChunkResult};
use crate::remote::{Connector, RemoteCatalog};
use crate::settings::SyncSettings;
use crate::state::{LogStore, SkuIndex, StateError};

/// Entry point for sync runs: one page at a time, or all stores at once.
///
/// Calls that write to the destination are serialized through a single lock
/// so two runs never interleave their upserts.
pub struct SyncRunner {
    settings: SyncSettings,
    connector: Arc<dyn Connector>,
    catalog: Arc<dyn Catalog>,
    index: Arc<dyn SkuIndex>,
    logs: Arc<dyn LogStore>,
    write_lock: Mutex<()>,
}

impl SyncRunner {
    pub fn new(
        settings: SyncSettings,
        connector: Arc<dyn Connector>,
        catalog: Arc<dyn Catalog>,
        index: Arc<dyn SkuIndex>,
        logs: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            settings,
            connector,
            catalog,
            index,
            logs,
            write_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Stores to sync, in order. Each one starts at page 0.
    pub fn start(&self) -> Vec<String> {
        self.settings.store_list()
    }

    /// Sync one page of one store.
    ///
    /// On failure `next_page` is `None` and nothing was written for the
    /// page; requesting the same page again is the retry.
    pub async fn process_chunk(&self, store: &str, page: u32, page_size: u32) -> SyncChunkResult {
        let _guard = self.write_lock.lock().await;

        let mut log = RunLog::new(store);
        log.debug(format!(
            "process_chunk started - store={store}, page={page}, page_size={page_size}"
        ));

        let result = match self.connect(store, &mut log) {
            Ok(remote) => {
                match self
                    .reconciler()
                    .sync_page(remote.as_ref(), store, page, page_size.max(1), &mut log)
                    .await
                {
                    Ok(report) => SyncChunkResult {
                        success: true,
                        processed: report.processed,
                        total_results: report.total_results,
                        next_page: report.next_page,
                        logs: log.into_lines(),
                        outcomes: report.outcomes,
                        error: None,
                    },
                    Err(err) => SyncChunkResult::failed(err, log.into_lines()),
                }
            }
            Err(err) => SyncChunkResult::failed(err, log.into_lines()),
        };

        self.persist(store, &result.logs).await;
        result
    }

    /// Accumulated log lines for a store. Appends `extra` first, if given.
    pub async fn status(
        &self,
        store: &str,
        extra: Option<&[LogLine]>,
    ) -> Result<Vec<String>, StateError> {
        if let Some(lines) = extra.filter(|l| !l.is_empty()) {
            self.logs.append(store, lines).await?;
        }
        self.logs.lines(store).await
    }

    pub async fn clear_status(&self, store: &str) -> Result<(), StateError> {
        self.logs.clear(store).await
    }

    /// Run every configured store to completion, pruning after each store
    /// when enabled. A failing store ends at its failing page; the remaining
    /// stores still run.
    pub async fn sync_all_stores(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        let stores = self.start();
        if stores.is_empty() {
            let err = SyncError::Config("no stores configured".into());
            tracing::warn!(error = %err, "nothing to sync");
            summary.errors.push(err.to_string());
            return summary;
        }

        let page_size = self.settings.effective_page_size();
        for store in &stores {
            tracing::info!(store = %store, "syncing store");
            let mut page = 0;

            loop {
                let chunk = self.process_chunk(store, page, page_size).await;
                if !chunk.success {
                    let reason = chunk
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".into());
                    summary.errors.push(format!("Store {store} page {page}: {reason}"));
                    break;
                }

                summary.processed += chunk.processed;
                summary.pages += 1;

                match chunk.next_page {
                    Some(next) => page = next,
                    None => break,
                }
            }

            if self.settings.delete_missing {
                summary.pruned.push(self.delete_missing(store).await);
            }
        }

        summary
    }

    /// Remove destination products that fell out of a store's listing.
    pub async fn delete_missing(&self, store: &str) -> PruneReport {
        let _guard = self.write_lock.lock().await;

        let mut log = RunLog::new(store);
        log.info(format!("Checking {store} for products removed upstream"));

        let mut report = match self.connect(store, &mut log) {
            Ok(remote) => {
                self.reconciler()
                    .delete_missing(remote.as_ref(), store, &mut log)
                    .await
            }
            Err(err) => PruneReport {
                store: store.to_owned(),
                aborted: Some(err),
                ..Default::default()
            },
        };

        report.logs = log.into_lines();
        self.persist(store, &report.logs).await;
        report
    }

    /// Fetch and reconcile a single remote product by id.
    pub async fn sync_single_product(&self, store: &str, product_id: i64) -> SingleProductResult {
        let _guard = self.write_lock.lock().await;

        let mut log = RunLog::new(store);
        log.info(format!("Fetching product ID: {product_id}"));

        let result = match self.connect(store, &mut log) {
            Ok(remote) => {
                let outcome = self
                    .reconciler()
                    .sync_product(remote.as_ref(), store, product_id, &mut log)
                    .await;
                let error = outcome.skip_reason.clone();
                SingleProductResult {
                    outcome: Some(outcome),
                    logs: log.into_lines(),
                    error,
                }
            }
            Err(err) => SingleProductResult {
                outcome: None,
                logs: log.into_lines(),
                error: Some(err),
            },
        };

        self.persist(store, &result.logs).await;
        result
    }

    /// Enumerate the remote listing for browsing. Writes nothing.
    pub async fn list_products(&self, store: &str) -> Result<Vec<ListedProduct>, SyncError> {
        let mut log = RunLog::new(store);
        let remote = self.connect(store, &mut log)?;
        let summaries = remote
            .fetch_all(self.settings.effective_page_size())
            .await?;

        Ok(summaries
            .into_iter()
            .map(|summary| ListedProduct {
                id: summary.id,
                sku: summary.resolve_sku(&self.settings.sku_prefix),
                name: summary
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Product {}", summary.id)),
            })
            .collect())
    }

    /// Verify credentials and reachability of one store.
    pub async fn check(&self, store: &str) -> Result<(), SyncError> {
        let mut log = RunLog::new(store);
        let remote = self.connect(store, &mut log)?;
        remote.check().await?;
        Ok(())
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.settings, self.catalog.as_ref(), self.index.as_ref())
    }

    fn connect(&self, store: &str, log: &mut RunLog) -> Result<Arc<dyn RemoteCatalog>, SyncError> {
        let Some(api_key) = self.settings.api_key() else {
            log.error("API key not set");
            return Err(SyncError::Config("API key not set".into()));
        };

        let store = store.trim();
        if store.is_empty() {
            log.error("Store URI is empty");
            return Err(SyncError::Config("store URI is empty".into()));
        }

        Ok(self.connector.connect(store, api_key))
    }

    async fn persist(&self, store: &str, lines: &[LogLine]) {
        if lines.is_empty() {
            return;
        }
        if let Err(e) = self.logs.append(store, lines).await {
            tracing::warn!(store = %store, error = %e, "failed to persist sync log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductType;
    use crate::product::Sku;
    use crate::test_support::{
        InMemoryCatalog, InMemoryConnector, InMemoryRemote, simple_product, variable_product,
    };

    struct Harness {
        runner: SyncRunner,
        catalog: Arc<InMemoryCatalog>,
        remote: Arc<InMemoryRemote>,
    }

    fn harness(settings: SyncSettings, remote: InMemoryRemote) -> Harness {
        let remote = Arc::new(remote);
        let connector = Arc::new(InMemoryConnector::new());
        connector.add("acme", remote.clone());
        let catalog = Arc::new(InMemoryCatalog::new());
        let runner = SyncRunner::new(
            settings,
            connector,
            catalog.clone(),
            catalog.clone(),
            catalog.clone(),
        );
        Harness {
            runner,
            catalog,
            remote,
        }
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            api_key: Some("key".into()),
            stores: vec!["acme".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_remote_call() {
        let remote = InMemoryRemote::with_products("acme", vec![simple_product(1, "A")]);
        let h = harness(SyncSettings::default(), remote);

        let result = h.runner.process_chunk("acme", 0, 10).await;

        assert!(!result.success);
        assert!(matches!(result.error, Some(SyncError::Config(_))));
        assert_eq!(result.next_page, None);
        assert!(result.logs.iter().any(|l| l.message() == "API key not set"));
        assert_eq!(h.remote.listing_calls(), 0);
    }

    #[tokio::test]
    async fn chunk_reports_cursor_until_exhausted() {
        let products = (1..=5).map(|i| simple_product(i, &format!("P{i}"))).collect();
        let h = harness(settings(), InMemoryRemote::with_products("acme", products));

        let first = h.runner.process_chunk("acme", 0, 2).await;
        assert!(first.success);
        assert_eq!(first.processed, 2);
        assert_eq!(first.total_results, 5);
        assert_eq!(first.next_page, Some(1));

        let last = h.runner.process_chunk("acme", 2, 2).await;
        assert_eq!(last.processed, 1);
        assert_eq!(last.next_page, None);
    }

    #[tokio::test]
    async fn listing_failure_keeps_page_retryable() {
        let remote = InMemoryRemote::with_products("acme", vec![simple_product(1, "A")]);
        remote.fail_page(0);
        let h = harness(settings(), remote);

        let failed = h.runner.process_chunk("acme", 0, 10).await;
        assert!(!failed.success);
        assert!(matches!(failed.error, Some(SyncError::Transport(_))));
        assert_eq!(h.catalog.product_count(), 0);

        h.remote.heal();
        let retried = h.runner.process_chunk("acme", 0, 10).await;
        assert!(retried.success);
        assert_eq!(retried.processed, 1);
    }

    #[tokio::test]
    async fn status_accumulates_across_chunks() {
        let h = harness(
            settings(),
            InMemoryRemote::with_products("acme", vec![simple_product(1, "A")]),
        );

        h.runner.process_chunk("acme", 0, 10).await;
        let after_one = h.runner.status("acme", None).await.unwrap();
        h.runner.process_chunk("acme", 0, 10).await;
        let after_two = h.runner.status("acme", None).await.unwrap();

        assert!(!after_one.is_empty());
        assert!(after_two.len() > after_one.len());
        assert!(after_two[..after_one.len()] == after_one[..]);
    }

    #[tokio::test]
    async fn status_appends_client_lines() {
        let h = harness(settings(), InMemoryRemote::new("acme"));

        let lines = h
            .runner
            .status("acme", Some(&[LogLine::info("client note")]))
            .await
            .unwrap();

        assert_eq!(lines, vec!["client note".to_owned()]);
    }

    #[tokio::test]
    async fn full_run_syncs_then_prunes_removed_products() {
        let remote = InMemoryRemote::with_products(
            "acme",
            vec![
                simple_product(1, "A"),
                simple_product(2, "B"),
                simple_product(3, "C"),
            ],
        );
        let h = harness(settings(), remote);

        let first = h.runner.sync_all_stores().await;
        assert!(first.success());
        assert_eq!(first.processed, 3);
        assert_eq!(h.catalog.product_count(), 3);

        h.remote.remove(2);
        let second = h.runner.sync_all_stores().await;

        assert!(second.success());
        let prune = &second.pruned[0];
        assert_eq!(prune.deleted.len(), 1);
        assert_eq!(prune.deleted[0].0, Sku::new("B"));
        assert_eq!(prune.kept, 2);
        assert_eq!(h.catalog.product_count(), 2);
        assert!(h.catalog.find_sku("B").is_none());
    }

    #[tokio::test]
    async fn prune_aborts_without_deleting_when_listing_fails() {
        let remote = InMemoryRemote::with_products(
            "acme",
            vec![simple_product(1, "A"), simple_product(2, "B")],
        );
        let h = harness(settings(), remote);
        h.runner.sync_all_stores().await;

        h.remote.remove(2);
        h.remote.fail_page(0);
        let report = h.runner.delete_missing("acme").await;

        assert!(report.aborted.is_some());
        assert!(report.deleted.is_empty());
        assert_eq!(h.catalog.product_count(), 2);
    }

    #[tokio::test]
    async fn no_stores_is_a_configuration_error() {
        let h = harness(
            SyncSettings {
                api_key: Some("key".into()),
                ..Default::default()
            },
            InMemoryRemote::new("acme"),
        );

        let summary = h.runner.sync_all_stores().await;

        assert!(!summary.success());
        assert!(summary.errors[0].contains("no stores configured"));
    }

    #[tokio::test]
    async fn single_product_sync_writes_variations() {
        let remote = InMemoryRemote::with_products(
            "acme",
            vec![variable_product(7, "TEE", &["Black", "White"], &["S", "M"])],
        );
        let h = harness(settings(), remote);

        let result = h.runner.sync_single_product("acme", 7).await;

        assert!(result.error.is_none());
        let outcome = result.outcome.unwrap();
        assert_eq!(outcome.variations_written, 4);
        let id = outcome.product_id.unwrap();
        assert_eq!(
            h.catalog.product(id).unwrap().product_type,
            Some(ProductType::Variable)
        );
    }

    #[tokio::test]
    async fn single_product_detail_failure_is_reported() {
        let remote = InMemoryRemote::with_products("acme", vec![simple_product(7, "A")]);
        remote.fail_detail(7);
        let h = harness(settings(), remote);

        let result = h.runner.sync_single_product("acme", 7).await;

        assert!(matches!(
            result.error,
            Some(SyncError::DetailFetch { id: 7, .. })
        ));
        assert_eq!(h.catalog.product_count(), 0);
    }

    #[tokio::test]
    async fn list_products_resolves_fallback_skus() {
        let mut nameless = simple_product(9, "X");
        nameless.sku = None;
        nameless.name = None;
        let h = harness(
            settings(),
            InMemoryRemote::with_products("acme", vec![nameless]),
        );

        let listed = h.runner.list_products("acme").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sku, Sku::new("inksoft-9"));
        assert_eq!(listed[0].name, "Product 9");
    }
}
