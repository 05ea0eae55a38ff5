use catalog_sync::{ListedProduct, LogLine, ProductAction, ProductOutcome};

const MAX_NAME_WIDTH: usize = 40;
const LINE_BUDGET: usize = 90;

/// Print log lines in order: warnings and errors to stderr, the rest to stdout.
pub fn print_log(lines: &[LogLine]) {
    for line in lines {
        if line.is_error() || line.is_warning() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

/// One-line summary of a product outcome.
pub fn outcome_line(outcome: &ProductOutcome) -> String {
    let sku = outcome
        .sku
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());

    match outcome.action {
        ProductAction::Skipped => {
            let reason = outcome
                .skip_reason
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default();
            format!("skipped {} ({sku}): {reason}", outcome.remote_id)
        }
        ProductAction::Created | ProductAction::Updated => {
            let verb = if outcome.action == ProductAction::Created {
                "created"
            } else {
                "updated"
            };
            let mut line = format!("{verb} {} ({sku})", outcome.remote_id);
            if outcome.variations_written > 0 {
                line.push_str(&format!(", {} variations", outcome.variations_written));
            }
            let failed = outcome.failed_fields();
            if !failed.is_empty() {
                let names: Vec<String> = failed.iter().map(|f| f.to_string()).collect();
                line.push_str(&format!(", failed: {}", names.join(", ")));
            }
            line
        }
    }
}

pub fn print_product_table(products: &[ListedProduct]) {
    if products.is_empty() {
        println!("No products.");
        return;
    }

    let id_width = products
        .iter()
        .map(|p| p.id.to_string().len())
        .max()
        .unwrap_or(0);
    let sku_width = products
        .iter()
        .map(|p| p.sku.to_string().chars().count())
        .max()
        .unwrap_or(0);
    let name_budget = LINE_BUDGET
        .saturating_sub(id_width + sku_width + 4)
        .min(MAX_NAME_WIDTH);

    for product in products {
        println!(
            "{:>id_width$}  {:<sku_width$}  {}",
            product.id,
            product.sku.to_string(),
            truncate(&product.name, name_budget),
        );
    }

    println!("\n{} products", products.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let kept: String = s.chars().take(max - 3).collect();
    format!("{kept}...")
}
