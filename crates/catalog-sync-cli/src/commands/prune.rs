use anyhow::Result;
use catalog_sync::SyncRunner;

use super::format::print_log;

pub async fn run(runner: &SyncRunner, store: &str) -> Result<()> {
    let report = runner.delete_missing(store).await;

    print_log(&report.logs);

    if let Some(err) = report.aborted {
        anyhow::bail!("prune aborted for {store}: {err}");
    }

    for (sku, id) in &report.deleted {
        println!("  deleted {sku} (product {id})");
    }
    for (sku, reason) in &report.failed {
        eprintln!("  failed to delete {sku}: {reason}");
    }

    println!(
        "Pruned {store}: {} deleted, {} kept, {} failed",
        report.deleted.len(),
        report.kept,
        report.failed.len()
    );
    Ok(())
}
