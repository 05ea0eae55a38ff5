use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Full product record as returned by the remote detail endpoint.
///
/// Remote payloads are inconsistently shaped: numbers arrive as strings,
/// collections arrive as `null`, and elements of a collection are sometimes
/// not objects at all. Every field is optional and every collection defaults
/// to empty; elements that do not fit the typed shape are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteProduct {
    #[serde(rename = "ID", deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub sku: Option<String>,
    #[serde(rename = "SKU", default, deserialize_with = "de::string")]
    pub sku_upper: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub long_description: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub unit_cost: Option<f64>,
    #[serde(default, deserialize_with = "de::string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub supplier: Option<String>,
    #[serde(default, deserialize_with = "de::list")]
    pub styles: Vec<Style>,
    #[serde(default, deserialize_with = "de::list")]
    pub categories: Vec<CategoryRef>,
    #[serde(default, deserialize_with = "de::string")]
    pub category: Option<String>,
    /// Fields the typed model does not name, reachable by axis paths.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A named product style (usually a color), candidate value of the first axis.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Style {
    #[serde(default, deserialize_with = "de::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "de::string")]
    pub image_file_path: Option<String>,
    #[serde(default, deserialize_with = "de::list")]
    pub sides: Vec<Side>,
    #[serde(default, deserialize_with = "de::list")]
    pub sizes: Vec<Size>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One printable side of a style with its mockup image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Side {
    #[serde(default, deserialize_with = "de::string")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub image_file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Size {
    #[serde(default, deserialize_with = "de::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::decimal")]
    pub unit_price: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Category entries arrive either as bare strings or as `{ "Name": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Plain(String),
    Named(NamedCategory),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCategory {
    #[serde(rename = "Name", default, deserialize_with = "de::string")]
    pub name: Option<String>,
}

impl CategoryRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Plain(name) if !name.is_empty() => Some(name),
            Self::Plain(_) => None,
            Self::Named(named) => named.name.as_deref(),
        }
    }
}

/// Entry of the paginated product listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductSummary {
    #[serde(rename = "ID", deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub sku: Option<String>,
    #[serde(rename = "SKU", default, deserialize_with = "de::string")]
    pub sku_upper: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub name: Option<String>,
}

impl ProductSummary {
    pub fn resolve_sku(&self, prefix: &str) -> Sku {
        Sku::resolve(self.sku.as_deref(), self.sku_upper.as_deref(), prefix, self.id)
    }
}

/// Stable cross-run join key between remote and destination records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sku(String);

impl Sku {
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Prefer `Sku`, then `SKU`, then the deterministic `<prefix>-<id>` form.
    pub fn resolve(sku: Option<&str>, sku_upper: Option<&str>, prefix: &str, id: i64) -> Self {
        [sku, sku_upper]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(Self::new)
            .unwrap_or_else(|| Self(format!("{prefix}-{id}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which remote field the base price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    FirstStylePrice,
    UnitPrice,
    UnitCost,
    Default,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstStylePrice => write!(f, "Styles[0].Price"),
            Self::UnitPrice => write!(f, "UnitPrice"),
            Self::UnitCost => write!(f, "UnitCost"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Images to sync for a product, resolved from its first style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSet {
    /// Side mockups in listing order as `(side label, image path)`.
    Sides(Vec<(String, String)>),
    /// A style without a sides array but with a direct image.
    Single(String),
    None,
}

impl RemoteProduct {
    pub fn resolve_sku(&self, prefix: &str) -> Sku {
        Sku::resolve(self.sku.as_deref(), self.sku_upper.as_deref(), prefix, self.id)
    }

    pub fn first_style(&self) -> Option<&Style> {
        self.styles.first()
    }

    /// First non-empty of the first style's price, unit price, unit cost.
    pub fn base_price(&self) -> (f64, PriceSource) {
        let candidates = [
            (self.first_style().and_then(|s| s.price), PriceSource::FirstStylePrice),
            (self.unit_price, PriceSource::UnitPrice),
            (self.unit_cost, PriceSource::UnitCost),
        ];

        candidates
            .into_iter()
            .find_map(|(price, source)| price.filter(|p| *p != 0.0).map(|p| (p, source)))
            .unwrap_or((0.0, PriceSource::Default))
    }

    /// Display title with markup removed.
    pub fn title(&self) -> String {
        let name = self.name.as_deref().unwrap_or("InkSoft Product");
        strip_tags(name).trim().to_owned()
    }

    pub fn body(&self) -> String {
        self.long_description
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_default()
    }

    pub fn excerpt(&self) -> String {
        self.short_description.clone().unwrap_or_default()
    }

    /// Category names in listing order, falling back to the single `Category` field.
    pub fn category_names(&self) -> Vec<String> {
        if self.categories.is_empty() {
            return self.category.iter().cloned().collect();
        }

        self.categories
            .iter()
            .filter_map(CategoryRef::name)
            .map(str::to_owned)
            .collect()
    }

    pub fn images(&self) -> ImageSet {
        let Some(style) = self.first_style() else {
            return ImageSet::None;
        };

        if !style.sides.is_empty() {
            let sides = style
                .sides
                .iter()
                .enumerate()
                .filter_map(|(idx, side)| {
                    let path = side.image_file_path.clone()?;
                    let label = side.side.clone().unwrap_or_else(|| format!("side {idx}"));
                    Some((label, path))
                })
                .collect();
            return ImageSet::Sides(sides);
        }

        match &style.image_file_path {
            Some(path) => ImageSet::Single(path.clone()),
            None => ImageSet::None,
        }
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Lenient deserializers for remote fields.
mod de {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| serde::de::Error::custom(format!("invalid ID {n}"))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid ID {s:?}"))),
            other => Err(serde::de::Error::custom(format!("invalid ID {other}"))),
        }
    }

    /// Strings and numbers become text; blanks and everything else are absent.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Numbers and numeric strings become `f64`; anything else is absent.
    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(parse_decimal(&Value::deserialize(d)?))
    }

    pub fn parse_decimal(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `null` and non-arrays become empty; elements of the wrong shape are dropped.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

pub(crate) use de::parse_decimal;
