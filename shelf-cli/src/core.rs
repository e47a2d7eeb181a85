use shelf::catalog::Catalog;
use shelf::loader::load_seed_file;
use shelf::store::{CatalogStore, MemoryStore, SqliteStore};
use shelf_config::shared::{ShelfConfig, StoreConfig};
use tracing::{debug, info};

use crate::commands::Command;

/// Opens a catalog over the configured store and runs `command` against it.
///
/// A memory store starts out empty on every run, so it is filled from the configured seed file
/// first unless the command itself is a `seed`.
pub async fn run_with_config(config: ShelfConfig, command: Command) -> anyhow::Result<()> {
    log_config(&config);

    // Each store gets its own monomorphized catalog.
    match &config.store {
        StoreConfig::Memory => {
            let mut catalog = Catalog::open_with_system_clock(MemoryStore::new()).await?;

            if let Some(seed_file) = &config.seed_file {
                if !command.is_seed() {
                    let seed = load_seed_file(seed_file).await?;
                    catalog.ingest(seed).await?;
                }
            }

            run_command(catalog, &config, command).await?;
        }
        StoreConfig::Sqlite(sqlite_config) => {
            let store = SqliteStore::connect(sqlite_config).await?;
            let catalog = Catalog::open_with_system_clock(store).await?;

            run_command(catalog, &config, command).await?;
        }
    }

    Ok(())
}

async fn run_command<S>(
    mut catalog: Catalog<S>,
    config: &ShelfConfig,
    command: Command,
) -> anyhow::Result<()>
where
    S: CatalogStore,
{
    let name = command.name();
    info!(command = name, "running command");

    let result = command.run(&mut catalog, config).await;
    catalog.close().await;

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!(command = name, "command completed");

    Ok(())
}

fn log_config(config: &ShelfConfig) {
    match &config.store {
        StoreConfig::Memory => debug!("using the memory store"),
        StoreConfig::Sqlite(sqlite_config) => debug!(
            path = %sqlite_config.path.display(),
            create_if_missing = sqlite_config.create_if_missing,
            "using the sqlite store"
        ),
    }

    if let Some(seed_file) = &config.seed_file {
        debug!(seed_file = %seed_file.display(), "seed file configured");
    }
}
