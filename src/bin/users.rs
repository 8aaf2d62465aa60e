use anyhow::Result;
use clap::{Parser, Subcommand};
use pocdesk::db::{migrate, Db};
use pocdesk::model::Role;
use pocdesk::store;
use pocdesk::Config;

#[derive(Parser, Debug)]
#[command(name = "users")]
#[command(about = "Manage pocdesk identities")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a user or change its name/role
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// admin or dpr
        #[arg(long, default_value = "dpr")]
        role: Role,
    },
    /// List registered users
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    match args.command {
        Command::Add { email, name, role } => {
            let user = db
                .with_connection(move |conn| store::upsert_user(conn, &email, &name, role))
                .await?;
            log::info!("Saved {} ({}) as {}", user.email, user.name, user.role);
        }
        Command::List => {
            let users = db.with_connection(|conn| store::list_users(conn)).await?;
            if users.is_empty() {
                println!("No users registered");
            }
            for user in users {
                println!("{:<6} {:<32} {}", user.role.as_str(), user.email, user.name);
            }
        }
    }

    Ok(())
}
