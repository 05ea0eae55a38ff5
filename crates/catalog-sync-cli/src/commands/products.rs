use anyhow::Result;
use catalog_sync::SyncRunner;

use super::format::print_product_table;

pub async fn run(runner: &SyncRunner, store: &str) -> Result<()> {
    let products = runner.list_products(store).await?;
    print_product_table(&products);
    Ok(())
}
