use std::sync::Arc;

use crate::product::{ProductSummary, RemoteProduct};

/// Hard bound on listing fetches in one enumeration, whatever the
/// pagination math says.
pub const MAX_LISTING_PAGES: u32 = 1000;

/// Errors that can occur when talking to the remote catalog.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Payload(String),

    #[error("product not found: {0}")]
    NotFound(i64),

    #[error("listing did not finish within {0} pages")]
    PageLimit(u32),
}

/// One page of the remote product listing.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<ProductSummary>,
    /// Total reported by the remote, used for progress display.
    pub total_results: u64,
    pub has_more: bool,
}

impl ListingPage {
    /// Build a page from what the remote returned.
    ///
    /// Without a pagination block the page is the whole listing. With one,
    /// more pages exist while `total > (page + 1) * page_size`.
    pub fn new(
        items: Vec<ProductSummary>,
        reported_total: Option<u64>,
        page: u32,
        page_size: u32,
    ) -> Self {
        let total_results = reported_total.unwrap_or(items.len() as u64);
        let has_more = reported_total.is_some()
            && total_results > (u64::from(page) + 1) * u64::from(page_size);

        Self {
            items,
            total_results,
            has_more,
        }
    }

    /// Cursor to request after `page`, or `None` when the listing is exhausted
    /// or the page cap is reached.
    pub fn next_page(&self, page: u32) -> Option<u32> {
        page.checked_add(1)
            .filter(|next| self.has_more && *next < MAX_LISTING_PAGES)
    }
}

/// Read-only access to a remote product catalog.
#[async_trait::async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Human-readable label identifying the remote store.
    fn label(&self) -> &str;

    /// Check that the remote answers with the configured credentials.
    async fn check(&self) -> Result<(), RemoteError>;

    /// Fetch one page of product summaries (page numbers start at zero).
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, RemoteError>;

    /// Fetch the full product record including styles, pricing and categories.
    async fn fetch_detail(&self, id: i64) -> Result<RemoteProduct, RemoteError>;

    /// Enumerate the whole listing.
    ///
    /// Fails as a whole if any page fails, the page cap is hit, or the
    /// listing runs dry before the reported total; callers never see a
    /// partial enumeration.
    async fn fetch_all(&self, page_size: u32) -> Result<Vec<ProductSummary>, RemoteError> {
        let mut all = Vec::new();
        let mut page = 0;

        loop {
            let listing = self.fetch_page(page, page_size).await?;
            if listing.items.is_empty() {
                if listing.total_results > all.len() as u64 {
                    return Err(RemoteError::Payload(format!(
                        "page {page} was empty after {} of {} reported results",
                        all.len(),
                        listing.total_results
                    )));
                }
                return Ok(all);
            }

            let has_more = listing.has_more;
            all.extend(listing.items);
            if !has_more {
                return Ok(all);
            }

            page += 1;
            if page >= MAX_LISTING_PAGES {
                return Err(RemoteError::PageLimit(MAX_LISTING_PAGES));
            }
        }
    }
}

#[async_trait::async_trait]
impl<T: RemoteCatalog + ?Sized> RemoteCatalog for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn check(&self) -> Result<(), RemoteError> {
        (**self).check().await
    }

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, RemoteError> {
        (**self).fetch_page(page, page_size).await
    }

    async fn fetch_detail(&self, id: i64) -> Result<RemoteProduct, RemoteError> {
        (**self).fetch_detail(id).await
    }

    async fn fetch_all(&self, page_size: u32) -> Result<Vec<ProductSummary>, RemoteError> {
        (**self).fetch_all(page_size).await
    }
}

/// Builds a remote client for one configured store.
pub trait Connector: Send + Sync {
    fn connect(&self, store: &str, api_key: &str) -> Arc<dyn RemoteCatalog>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<ProductSummary> {
        (0..n)
            .map(|i| ProductSummary {
                id: i as i64,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn pagination_walks_250_results_in_pages_of_100() {
        let first = ListingPage::new(items(100), Some(250), 0, 100);
        assert_eq!(first.next_page(0), Some(1));

        let second = ListingPage::new(items(100), Some(250), 1, 100);
        assert_eq!(second.next_page(1), Some(2));

        let third = ListingPage::new(items(50), Some(250), 2, 100);
        assert_eq!(third.next_page(2), None);
        assert_eq!(third.total_results, 250);
    }

    #[test]
    fn missing_pagination_means_single_page() {
        let page = ListingPage::new(items(100), None, 0, 100);
        assert_eq!(page.total_results, 100);
        assert!(!page.has_more);
        assert_eq!(page.next_page(0), None);
    }

    #[test]
    fn next_page_never_overflows() {
        let page = ListingPage::new(Vec::new(), Some(0), u32::MAX, 100);
        assert_eq!(page.next_page(u32::MAX), None);

        let page = ListingPage::new(items(1), Some(u64::MAX), u32::MAX, 1);
        assert!(page.has_more);
        assert_eq!(page.next_page(u32::MAX), None);
    }

    #[test]
    fn next_page_stops_at_page_cap() {
        let page = ListingPage::new(items(1), Some(u64::MAX), MAX_LISTING_PAGES - 1, 1);
        assert!(page.has_more);
        assert_eq!(page.next_page(MAX_LISTING_PAGES - 1), None);
    }
}
