use anyhow::Result;
use catalog_sync::SyncRunner;

use super::format::{outcome_line, print_log};

pub async fn run(runner: &SyncRunner, store: &str, id: i64) -> Result<()> {
    let result = runner.sync_single_product(store, id).await;

    print_log(&result.logs);

    if let Some(err) = result.error {
        anyhow::bail!("product {id} in {store}: {err}");
    }

    if let Some(outcome) = &result.outcome {
        println!("{}", outcome_line(outcome));
        if !outcome.succeeded() {
            anyhow::bail!("product {id} was not synced");
        }
    }
    Ok(())
}
