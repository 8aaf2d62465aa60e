use anyhow::Result;
use pocdesk::api::HttpServer;
use pocdesk::db::{migrate, Db};
use pocdesk::error::PocdeskError;
use pocdesk::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => run_http_server(&config).await?,
        "verify" => run_schema_verification(&config).await?,
        other => {
            log::warn!("Unknown command '{}', running verify", other);
            run_schema_verification(&config).await?;
        }
    }

    Ok(())
}

/// Open the database and apply pending migrations
async fn open_database(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;
    Ok(db)
}

async fn run_http_server(config: &Config) -> Result<()> {
    log::info!("Starting pocdesk HTTP server v{}", env!("CARGO_PKG_VERSION"));

    config.ensure_temp_dir()?;

    let db = open_database(config).await?;
    log::info!("Database initialized at {}", config.db_path().display());

    let server = HttpServer::new(db, config);
    server.run().await?;

    Ok(())
}

/// Check schema, pragmas and integrity of the configured database
async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting pocdesk v{}", env!("CARGO_PKG_VERSION"));

    log::info!("Database path: {}", config.db_path().display());
    log::info!("Upload temp dir: {}", config.temp_dir().display());

    let db = open_database(config).await?;

    db.with_connection(|conn| {
        let missing = migrate::missing_tables(conn)?;
        if !missing.is_empty() {
            for table in &missing {
                log::error!("Missing table: {}", table);
            }
            return Err(PocdeskError::Config("Not all required tables exist".to_string()));
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(PocdeskError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(PocdeskError::Config("Foreign keys not enabled".to_string()));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(PocdeskError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
