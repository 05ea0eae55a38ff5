use anyhow::Result;
use catalog_sync::SyncRunner;

use super::format::{outcome_line, print_log};

pub async fn run(
    runner: &SyncRunner,
    store: &str,
    page: u32,
    page_size: Option<u32>,
) -> Result<()> {
    let page_size = page_size.unwrap_or_else(|| runner.settings().effective_page_size());
    let chunk = runner.process_chunk(store, page, page_size).await;

    print_log(&chunk.logs);

    if let Some(err) = chunk.error {
        anyhow::bail!("store {store} page {page}: {err}");
    }

    for outcome in &chunk.outcomes {
        println!("  {}", outcome_line(outcome));
    }

    match chunk.next_page {
        Some(next) => println!(
            "Processed {} products ({} total). Next page: {next}",
            chunk.processed, chunk.total_results
        ),
        None => println!(
            "Processed {} products ({} total). Store complete.",
            chunk.processed, chunk.total_results
        ),
    }
    Ok(())
}
