use anyhow::Result;
use catalog_sync::SyncRunner;

pub fn run(runner: &SyncRunner) -> Result<()> {
    let stores = runner.start();
    if stores.is_empty() {
        anyhow::bail!("no stores configured");
    }

    for store in &stores {
        println!("{store}");
    }
    Ok(())
}
