use anyhow::Result;
use catalog_sync::SyncRunner;

/// Check one store, or every configured store when none is given.
pub async fn run(runner: &SyncRunner, store: Option<&str>) -> Result<()> {
    let stores = match store {
        Some(store) => vec![store.to_owned()],
        None => runner.start(),
    };
    if stores.is_empty() {
        anyhow::bail!("no stores configured");
    }

    let mut failed = 0usize;
    for store in &stores {
        match runner.check(store).await {
            Ok(()) => println!("{store}: ok"),
            Err(e) => {
                eprintln!("{store}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} store(s) unreachable", stores.len());
    }
    Ok(())
}
