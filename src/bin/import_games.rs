use std::{fs::File, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use game_catalog::{
    config::Config,
    db::{self, CatalogStore, MemoryStore, PgStore},
    import::import_games,
    telemetry,
};

#[derive(Parser, Debug)]
#[command(name = "import-games", version, about = "Load the Steam games CSV into the catalog")]
struct Cli {
    /// Path to the CSV export
    csv: PathBuf,

    /// PostgreSQL URL; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Parse and validate every row without writing to a database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("info")?;

    let cli = Cli::parse();
    let file = File::open(&cli.csv)
        .with_context(|| format!("failed to open {}", cli.csv.display()))?;

    let store: Arc<dyn CatalogStore> = if cli.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        let url = match cli.database_url {
            Some(url) => url,
            None => match Config::from_env()?.database_url {
                Some(url) => url,
                None => bail!("no database configured: pass --database-url, set DATABASE_URL or use --dry-run"),
            },
        };
        let pool = db::create_pool(&url, 1).await?;
        db::run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    tracing::info!(path = %cli.csv.display(), store = store.name(), "Importing games");
    let summary = import_games(file, store.as_ref()).await?;

    println!(
        "imported {} games, skipped {} rows",
        summary.imported, summary.skipped
    );
    Ok(())
}
