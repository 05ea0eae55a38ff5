use anyhow::Result;
use catalog_sync::SyncRunner;

pub async fn run(runner: &SyncRunner, store: &str, clear: bool) -> Result<()> {
    if clear {
        runner.clear_status(store).await?;
        println!("Cleared sync log for {store}.");
        return Ok(());
    }

    let lines = runner.status(store, None).await?;
    if lines.is_empty() {
        println!("No recent sync activity for {store}.");
    }
    for line in &lines {
        println!("{line}");
    }
    Ok(())
}
