use serde::{Deserialize, Serialize};

/// Declares how one attribute axis is read from a remote product and where it
/// lands in the destination catalog.
///
/// Declaration order is significant: it fixes the position of the axis in
/// every variation tuple, and therefore SKU suffix order, title suffix order
/// and attribute slot order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AxisConfig {
    pub key: String,
    /// Dotted path into the remote product, e.g. `Styles` or `Styles.Sizes`.
    pub path: String,
    /// Destination attribute identifier, e.g. `pa_color`.
    pub attribute_slug: String,
    #[serde(alias = "attribute_label")]
    pub label: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Parsed form of [`AxisConfig::path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisPath<'a> {
    /// A collection directly on the product.
    Direct(&'a str),
    /// A collection nested in every element of a parent collection.
    Nested { parent: &'a str, child: &'a str },
    /// Empty paths and paths deeper than two segments extract nothing.
    Unsupported,
}

impl<'a> AxisPath<'a> {
    pub fn parse(path: &'a str) -> Self {
        let parts: Vec<&str> = path.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [direct] if !direct.is_empty() => Self::Direct(*direct),
            [parent, child] if !parent.is_empty() && !child.is_empty() => {
                Self::Nested {
                    parent: *parent,
                    child: *child,
                }
            }
            _ => Self::Unsupported,
        }
    }
}

impl AxisConfig {
    pub fn new(key: &str, path: &str, attribute_slug: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            path: path.to_owned(),
            attribute_slug: attribute_slug.to_owned(),
            label: label.to_owned(),
            enabled: true,
        }
    }

    pub fn axis_path(&self) -> AxisPath<'_> {
        AxisPath::parse(&self.path)
    }
}

/// Built-in axes: style as color, sizes nested inside styles.
pub fn default_axes() -> Vec<AxisConfig> {
    vec![
        AxisConfig::new("color", "Styles", "pa_color", "Color"),
        AxisConfig::new("size", "Styles.Sizes", "pa_size", "Size"),
    ]
}

/// Merge user axes over the defaults and keep the enabled ones.
///
/// A user entry with the key of a default replaces it in place; new keys are
/// appended in the order given.
pub fn resolve_axes(custom: &[AxisConfig]) -> Vec<AxisConfig> {
    let mut axes = default_axes();

    for entry in custom {
        match axes.iter_mut().find(|axis| axis.key == entry.key) {
            Some(existing) => *existing = entry.clone(),
            None => axes.push(entry.clone()),
        }
    }

    axes.retain(|axis| axis.enabled);
    axes
}
