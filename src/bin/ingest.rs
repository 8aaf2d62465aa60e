use anyhow::Result;
use clap::Parser;
use pocdesk::db::{migrate, Db};
use pocdesk::ingest::{discover_upload_files, ingest_local_file, ParserRegistry};
use pocdesk::store;
use pocdesk::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Bulk-load company spreadsheets from disk into the pocdesk database")]
struct Args {
    /// Email of a registered user; becomes the owner of every affected company
    #[arg(short, long)]
    owner: String,

    /// Files or directories to ingest (.csv, .xlsx, .xls)
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    let owner_lookup = args.owner.clone();
    let owner = db
        .with_connection(move |conn| store::resolve_user(conn, &owner_lookup))
        .await?
        .ok_or_else(|| anyhow::anyhow!("Unknown user {}. Register it first with `users add`", args.owner))?;
    log::info!("Ingesting as {} ({})", owner.email, owner.role);

    let mut files = Vec::new();
    for path in &args.paths {
        files.extend(discover_upload_files(path)?);
    }
    if files.is_empty() {
        log::warn!("No .csv, .xlsx or .xls files found");
        return Ok(());
    }

    let registry = Arc::new(ParserRegistry::new());
    let start = Instant::now();
    let mut affected = 0;
    let mut failed_candidates = 0;
    let mut rejected_files = 0;

    for (idx, file) in files.iter().enumerate() {
        log::info!("[{}/{}] {}", idx + 1, files.len(), file.display());
        match ingest_local_file(&db, registry.clone(), file, &owner.email).await {
            Ok(report) => {
                affected += report.affected_count();
                failed_candidates += report.failed_count();
                for outcome in report.outcomes.iter().filter(|o| o.error.is_some()) {
                    log::warn!(
                        "  {} failed: {}",
                        outcome.name,
                        outcome.error.as_deref().unwrap_or_default()
                    );
                }
            }
            Err(e) => {
                rejected_files += 1;
                log::error!("  rejected: {}", e);
            }
        }
    }

    log::info!(
        "Done in {:.2}s: {} files, {} companies affected, {} candidates failed, {} files rejected",
        start.elapsed().as_secs_f64(),
        files.len(),
        affected,
        failed_candidates,
        rejected_files
    );

    if rejected_files > 0 || failed_candidates > 0 {
        anyhow::bail!("Ingestion finished with errors");
    }

    Ok(())
}
