//! Attribute axis extraction and combinatorial variation expansion.
//!
//! An axis path names a collection on the remote product (`Styles`) or a
//! collection nested inside every element of one (`Styles.Sizes`). Known
//! collections are read from the typed model; any other name is looked up
//! among the fields the typed model retained as raw JSON, which is what lets
//! configuration add axes without code changes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::axis::{AxisConfig, AxisPath};
use crate::product::{CategoryRef, RemoteProduct, Side, Size, Style, parse_decimal};

/// One value of an attribute axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub name: String,
    /// Price override carried by this value, if any.
    pub unit_price: Option<f64>,
    /// Remote fields beyond the name, kept opaque.
    pub fields: BTreeMap<String, Value>,
}

impl AttributeValue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit_price: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// One value per contributing axis, in axis declaration order.
pub type Combination = Vec<AttributeValue>;

/// An element reachable by an axis path.
enum Node<'a> {
    Style(&'a Style),
    Size(&'a Size),
    Side(&'a Side),
    Category(&'a CategoryRef),
    Json(&'a Value),
}

impl<'a> Node<'a> {
    fn name(&self) -> Option<String> {
        match self {
            Self::Style(style) => style.name.clone(),
            Self::Size(size) => size.name.clone(),
            Self::Side(side) => side.side.clone(),
            Self::Category(category) => category.name().map(str::to_owned),
            Self::Json(value) => match value.get("Name")? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
        }
    }

    fn unit_price(&self) -> Option<f64> {
        match self {
            Self::Style(style) => style.unit_price,
            Self::Size(size) => size.unit_price,
            Self::Side(_) | Self::Category(_) => None,
            Self::Json(value) => value.get("UnitPrice").and_then(parse_decimal),
        }
    }

    fn fields(&self) -> BTreeMap<String, Value> {
        match self {
            Self::Style(style) => style.extra.clone(),
            Self::Size(size) => size.extra.clone(),
            Self::Side(side) => side
                .image_file_path
                .iter()
                .map(|path| ("ImageFilePath".to_owned(), Value::from(path.as_str())))
                .collect(),
            Self::Category(_) => BTreeMap::new(),
            Self::Json(value) => value
                .as_object()
                .map(|map| {
                    map.iter()
                        .filter(|(key, _)| key.as_str() != "Name")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn children(&self, key: &str) -> Vec<Node<'a>> {
        match self {
            Self::Style(style) if key == "Sizes" => style.sizes.iter().map(Node::Size).collect(),
            Self::Style(style) if key == "Sides" => style.sides.iter().map(Node::Side).collect(),
            Self::Style(style) => json_elements(style.extra.get(key)),
            Self::Size(size) => json_elements(size.extra.get(key)),
            Self::Side(_) | Self::Category(_) => Vec::new(),
            Self::Json(value) => json_elements(value.get(key)),
        }
    }

    fn to_value(&self) -> Option<AttributeValue> {
        Some(AttributeValue {
            name: self.name()?,
            unit_price: self.unit_price(),
            fields: self.fields(),
        })
    }
}

fn json_elements(value: Option<&Value>) -> Vec<Node<'_>> {
    match value {
        Some(Value::Array(items)) => items.iter().filter(|v| v.is_object()).map(Node::Json).collect(),
        _ => Vec::new(),
    }
}

fn top_level<'a>(product: &'a RemoteProduct, key: &str) -> Vec<Node<'a>> {
    match key {
        "Styles" => product.styles.iter().map(Node::Style).collect(),
        "Categories" => product.categories.iter().map(Node::Category).collect(),
        other => json_elements(product.extra.get(other)),
    }
}

/// Extract the named values of one axis.
///
/// Elements without a name are skipped and names are unique within the
/// axis, first occurrence winning. For nested paths the child collections of
/// every parent element are flattened first. Paths deeper than two segments
/// are not supported and yield nothing.
pub fn extract_axis_values(product: &RemoteProduct, path: &str) -> Vec<AttributeValue> {
    let nodes = match AxisPath::parse(path) {
        AxisPath::Direct(key) => top_level(product, key),
        AxisPath::Nested { parent, child } => top_level(product, parent)
            .iter()
            .flat_map(|parent_node| parent_node.children(child))
            .collect(),
        AxisPath::Unsupported => Vec::new(),
    };

    let mut values: Vec<AttributeValue> = Vec::new();
    for value in nodes.iter().filter_map(Node::to_value) {
        if values.iter().all(|existing| existing.name != value.name) {
            values.push(value);
        }
    }
    values
}

/// Cartesian product of the given axes, left-to-right in input order.
///
/// Zero axes yield no combinations; otherwise the result has exactly
/// `Π |axis|` tuples of length `axes.len()`.
pub fn cartesian_product<T: Clone>(axes: &[Vec<T>]) -> Vec<Vec<T>> {
    if axes.is_empty() {
        return Vec::new();
    }

    axes.iter().fold(vec![Vec::new()], |partials, axis| {
        partials
            .iter()
            .flat_map(|partial| {
                axis.iter().map(move |value| {
                    let mut next = partial.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect()
    })
}

/// Price of one variation.
///
/// The last value (the finest-grained axis, usually size) is the primary
/// price source; otherwise the first value in tuple order with an override
/// wins; otherwise the fallback.
pub fn price_for_combination(tuple: &[AttributeValue], fallback: f64) -> f64 {
    let has_override = |value: &AttributeValue| value.unit_price.filter(|p| *p != 0.0);

    tuple
        .last()
        .and_then(has_override)
        .or_else(|| tuple.iter().find_map(has_override))
        .unwrap_or(fallback)
}

/// `base-red-large` style SKU for a variation.
pub fn sku_for(base_sku: &str, tuple: &[AttributeValue]) -> String {
    std::iter::once(base_sku.to_owned())
        .chain(tuple.iter().map(AttributeValue::slug))
        .collect::<Vec<_>>()
        .join("-")
}

/// `Base - Red - Large` style title for a variation.
pub fn title_for(base_title: &str, tuple: &[AttributeValue]) -> String {
    std::iter::once(base_title)
        .chain(tuple.iter().map(|value| value.name.as_str()))
        .collect::<Vec<_>>()
        .join(" - ")
}

/// Attribute assignments of one variation as `(attribute slug, term slug)`.
///
/// Tuple positions are zipped with the axes in order; values beyond the last
/// axis are ignored, as are axes without an attribute slug.
pub fn attribute_meta_for(tuple: &[AttributeValue], axes: &[AxisConfig]) -> Vec<(String, String)> {
    tuple
        .iter()
        .zip(axes)
        .filter(|(_, axis)| !axis.attribute_slug.is_empty())
        .map(|(value, axis)| (axis.attribute_slug.clone(), value.slug()))
        .collect()
}

/// URL-safe lowercase form of a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_end_matches('-').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::default_axes;

    fn product(json: &str) -> RemoteProduct {
        serde_json::from_str(json).unwrap()
    }

    fn two_styles_sharing_large() -> RemoteProduct {
        product(
            r#"{"ID": 1, "Styles": [
                {"Name": "Red", "Sizes": [{"Name": "Small"}, {"Name": "Large", "UnitPrice": 12}]},
                {"Name": "Blue", "Sizes": [{"Name": "Large", "UnitPrice": 99}, {"Name": "XL"}]}
            ]}"#,
        )
    }

    #[test]
    fn direct_path_extracts_named_elements() {
        let product = product(r#"{"ID": 1, "Styles": [{"Name": "Red"}, {"Name": ""}, {"Name": "Blue"}]}"#);
        let names: Vec<String> = extract_axis_values(&product, "Styles")
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Red", "Blue"]);
    }

    #[test]
    fn nested_path_dedupes_by_name_first_wins() {
        let values = extract_axis_values(&two_styles_sharing_large(), "Styles.Sizes");
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Small", "Large", "XL"]);

        let large = values.iter().find(|v| v.name == "Large").unwrap();
        assert_eq!(large.unit_price, Some(12.0));
    }

    #[test]
    fn untyped_collections_are_reachable() {
        let product = product(
            r#"{"ID": 1, "Materials": [{"Name": "Cotton", "UnitPrice": "3.5", "Weight": 180}, {"Name": "Poly"}]}"#,
        );
        let values = extract_axis_values(&product, "Materials");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].unit_price, Some(3.5));
        assert_eq!(values[0].fields.get("Weight"), Some(&Value::from(180)));
        assert!(!values[0].fields.contains_key("Name"));
    }

    #[test]
    fn missing_and_unsupported_paths_extract_nothing() {
        let product = two_styles_sharing_large();
        assert!(extract_axis_values(&product, "Materials").is_empty());
        assert!(extract_axis_values(&product, "Styles.Sizes.Prices").is_empty());
    }

    #[test]
    fn direct_path_dedupes_by_name_first_wins() {
        let product = product(
            r#"{"ID": 1, "Styles": [
                {"Name": "Red", "UnitPrice": 11, "Sizes": [{"Name": "S"}]},
                {"Name": "Red", "UnitPrice": 99, "Sizes": [{"Name": "M"}]},
                {"Name": "Blue", "Sizes": [{"Name": "S"}]}
            ]}"#,
        );
        let values = extract_axis_values(&product, "Styles");
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Red", "Blue"]);
        assert_eq!(values[0].unit_price, Some(11.0));

        let sizes = extract_axis_values(&product, "Styles.Sizes");
        let combos = cartesian_product(&[values, sizes]);
        let skus: Vec<String> = combos.iter().map(|c| sku_for("X", c)).collect();
        assert_eq!(skus, vec!["X-red-s", "X-red-m", "X-blue-s", "X-blue-m"]);
    }

    #[test]
    fn typed_categories_are_an_axis() {
        let product = product(
            r#"{"ID": 1, "Categories": [{"Name": "Tees"}, "Summer", {"Name": "Tees"}, {"Name": ""}]}"#,
        );
        let names: Vec<String> = extract_axis_values(&product, "Categories")
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Tees", "Summer"]);
    }

    #[test]
    fn typed_sides_are_a_nested_axis() {
        let product = product(
            r#"{"ID": 1, "Styles": [
                {"Name": "Red", "Sides": [{"Side": "front", "ImageFilePath": "/r_f.png"}, {"Side": "back"}]},
                {"Name": "Blue", "Sides": [{"Side": "front", "ImageFilePath": "/b_f.png"}]}
            ]}"#,
        );
        let values = extract_axis_values(&product, "Styles.Sides");
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["front", "back"]);
        assert_eq!(
            values[0].fields.get("ImageFilePath"),
            Some(&Value::from("/r_f.png"))
        );
    }

    #[test]
    fn cartesian_product_of_two_by_three() {
        let axes = vec![vec!["a", "b"], vec!["1", "2", "3"]];
        let combos = cartesian_product(&axes);
        assert_eq!(combos.len(), 6);
        assert!(combos.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn cartesian_product_counts_and_membership_hold_for_zero_to_n_axes() {
        assert!(cartesian_product::<u32>(&[]).is_empty());

        let cardinalities = [3usize, 1, 4, 2];
        for n in 1..=cardinalities.len() {
            let axes: Vec<Vec<(usize, usize)>> = cardinalities[..n]
                .iter()
                .enumerate()
                .map(|(axis, &len)| (0..len).map(|v| (axis, v)).collect())
                .collect();

            let combos = cartesian_product(&axes);
            let expected: usize = cardinalities[..n].iter().product();
            assert_eq!(combos.len(), expected);

            for (axis_idx, axis) in axes.iter().enumerate() {
                for value in axis {
                    assert!(combos.iter().any(|c| c[axis_idx] == *value));
                }
            }
        }
    }

    #[test]
    fn cartesian_product_preserves_axis_positions() {
        let axes = vec![vec!["red", "blue"], vec!["s", "m"]];
        for combo in cartesian_product(&axes) {
            assert!(["red", "blue"].contains(&combo[0]));
            assert!(["s", "m"].contains(&combo[1]));
        }
    }

    #[test]
    fn price_prefers_last_value_then_any_then_fallback() {
        let red = AttributeValue::named("Red").with_price(20.0);
        let large = AttributeValue::named("Large").with_price(25.0);
        let small = AttributeValue::named("Small");

        assert_eq!(price_for_combination(&[red.clone(), large], 10.0), 25.0);
        assert_eq!(price_for_combination(&[red, small.clone()], 10.0), 20.0);
        assert_eq!(price_for_combination(&[AttributeValue::named("Blue"), small], 10.0), 10.0);
        assert_eq!(price_for_combination(&[], 10.0), 10.0);
    }

    #[test]
    fn sku_and_title_follow_tuple_order() {
        let tuple = vec![AttributeValue::named("Heather Grey"), AttributeValue::named("2XL")];
        assert_eq!(sku_for("TEE", &tuple), "TEE-heather-grey-2xl");
        assert_eq!(title_for("Classic Tee", &tuple), "Classic Tee - Heather Grey - 2XL");
    }

    #[test]
    fn attribute_meta_zips_positions_and_truncates() {
        let tuple = vec![
            AttributeValue::named("Red"),
            AttributeValue::named("Large"),
            AttributeValue::named("Extra"),
        ];
        let meta = attribute_meta_for(&tuple, &default_axes());
        assert_eq!(
            meta,
            vec![
                ("pa_color".to_owned(), "red".to_owned()),
                ("pa_size".to_owned(), "large".to_owned()),
            ]
        );
    }

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Heather Grey"), "heather-grey");
        assert_eq!(slugify("  Navy / White "), "navy-white");
        assert_eq!(slugify("Youth-M"), "youth-m");
        assert_eq!(slugify("2XL"), "2xl");
    }
}
