/// Apply a percentage markup to a positive base price, rounded to cents.
///
/// Non-positive prices are returned unchanged.
pub fn apply_markup(price: f64, markup_percent: f64) -> f64 {
    if price > 0.0 {
        round_cents(price * (1.0 + markup_percent / 100.0))
    } else {
        price
    }
}

pub fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Fixed two-decimal rendering used in logs and destination writes.
pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}
