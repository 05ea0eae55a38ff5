use crate::log::RunLog;
use crate::product::RemoteProduct;

/// Simple or variable, with the reasoning shown to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_variable: bool,
    pub reason: String,
    /// Styles with a name and at least one named size.
    pub valid_styles: usize,
    /// Named sizes summed over valid styles. Informational only: the mapper's
    /// variation count is a product over axes, not this sum.
    pub size_instances: usize,
}

impl Classification {
    fn simple(reason: impl Into<String>, valid_styles: usize, size_instances: usize) -> Self {
        Self {
            is_variable: false,
            reason: reason.into(),
            valid_styles,
            size_instances,
        }
    }
}

/// Decide whether a product needs variations.
///
/// Only structural name and size presence is consulted, never price or image
/// data. A product is variable when at least two styles each have a name and
/// at least one named size; a single style with many sizes stays simple.
pub fn classify(product: &RemoteProduct, log: &mut RunLog) -> Classification {
    log.debug(format!("Validating product attributes for ID: {}", product.id));

    if product.styles.is_empty() {
        log.debug("No Styles array found - SIMPLE product");
        return Classification::simple("No Styles array", 0, 0);
    }

    let style_count = product.styles.len();
    log.debug(format!("Found {style_count} style(s)"));

    if style_count < 2 {
        log.debug("Only 1 style - SIMPLE product");
        return Classification::simple("Only 1 style", 0, 0);
    }

    let mut valid_styles = 0;
    let mut size_instances = 0;

    for (idx, style) in product.styles.iter().enumerate() {
        let Some(name) = style.name.as_deref() else {
            log.debug(format!("Style {idx}: INVALID (missing Name) - skipping"));
            continue;
        };

        if style.sizes.is_empty() {
            log.debug(format!("Style {idx}: '{name}' INVALID: no Sizes"));
            continue;
        }

        let valid_sizes = style.sizes.iter().filter(|size| size.name.is_some()).count();
        if valid_sizes == 0 {
            log.debug(format!("Style {idx}: '{name}' INVALID: no sizes with names"));
            continue;
        }

        valid_styles += 1;
        size_instances += valid_sizes;
        log.debug(format!("Style {idx}: '{name}' has {valid_sizes} valid size(s)"));
    }

    if valid_styles < 2 {
        log.debug(format!(
            "Only {valid_styles} valid style(s) with sizes out of {style_count} - SIMPLE product"
        ));
        return Classification::simple(
            format!("Only {valid_styles} valid style(s) of {style_count}"),
            valid_styles,
            size_instances,
        );
    }

    log.debug(format!(
        "{valid_styles} valid styles with {size_instances} size instances - VARIABLE product"
    ));
    Classification {
        is_variable: true,
        reason: format!("{valid_styles} styles x sizes = {size_instances} variations"),
        valid_styles,
        size_instances,
    }
}
