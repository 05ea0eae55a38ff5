use serde::{Deserialize, Serialize};

use crate::axis::{AxisConfig, resolve_axes};

/// Configuration for a sync run, passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    pub api_key: Option<String>,
    /// Remote host; store URIs are appended as path segments.
    pub base_url: String,
    /// Store URIs in sync order.
    pub stores: Vec<String>,
    pub markup_percent: f64,
    pub page_size: u32,
    /// Run the pruning sweep after a full store sync.
    pub delete_missing: bool,
    /// Replace existing product images instead of keeping them.
    pub replace_images: bool,
    /// Prefix of the fallback `<prefix>-<id>` SKU.
    pub sku_prefix: String,
    /// Placeholder quantity written with the in-stock status.
    pub stock_quantity: i64,
    /// Axis overrides merged over the built-in color and size axes.
    pub attributes: Vec<AxisConfig>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://stores.inksoft.com".into(),
            stores: Vec::new(),
            markup_percent: 0.0,
            page_size: 100,
            delete_missing: true,
            replace_images: true,
            sku_prefix: "inksoft".into(),
            stock_quantity: 999,
            attributes: Vec::new(),
        }
    }
}

impl SyncSettings {
    /// The API key if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Configured store URIs, trimmed, blanks dropped, order kept.
    pub fn store_list(&self) -> Vec<String> {
        self.stores
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Enabled axes in declaration order.
    pub fn axes(&self) -> Vec<AxisConfig> {
        resolve_axes(&self.attributes)
    }

    /// Page size with a floor of one so pagination always advances.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.max(1)
    }
}
