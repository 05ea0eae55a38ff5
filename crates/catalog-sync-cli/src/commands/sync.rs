use anyhow::Result;
use catalog_sync::SyncRunner;

use super::format::print_log;

/// Run every store to completion and print a summary.
pub async fn run(runner: &SyncRunner) -> Result<()> {
    let stores = runner.start();
    println!("Syncing {} store(s)...", stores.len());

    let summary = runner.sync_all_stores().await;

    for report in &summary.pruned {
        print_log(&report.logs);
        println!(
            "Pruned {}: {} deleted, {} kept, {} failed",
            report.store,
            report.deleted.len(),
            report.kept,
            report.failed.len()
        );
    }

    for error in &summary.errors {
        eprintln!("error: {error}");
    }

    println!(
        "Synced {} products over {} pages.",
        summary.processed, summary.pages
    );

    if !summary.success() {
        anyhow::bail!("{} store page(s) failed", summary.errors.len());
    }
    Ok(())
}
