use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::{Row, SqlitePool};

use makerspace::authz::{ScopeArea, REGISTRY};
use makerspace::models::user::UserInput;
use makerspace::{db, store, utils};

#[derive(Parser, Debug)]
#[command(author, version, about = "makerspace administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create the first user with an Admin role
    BootstrapAdmin {
        #[arg(long)]
        uuid: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        college_id: String,
    },
    /// List every scope, grouped by area
    Scopes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            get_migrator().await?.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::BootstrapAdmin { uuid, name, email, college_id } => {
            let pool = get_pool().await?;
            get_migrator().await?.run(&pool).await?;
            let input = UserInput { uuid, name, email, college_id };
            let user = store::users::initialize_admin(&pool, &input, utils::now_ts())
                .await
                .context("could not bootstrap the admin user")?;
            println!("Created admin {} <{}>", user.uuid, user.email);
        }
        Commands::Scopes => print_scopes(),
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    db::connect(&database_url).await
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate's own folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", display))
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let has_table: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    let applied_versions: HashSet<i64> = if has_table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn print_scopes() {
    let areas = [
        ScopeArea::Admin,
        ScopeArea::Users,
        ScopeArea::Roles,
        ScopeArea::Schedules,
        ScopeArea::Shifts,
        ScopeArea::Alerts,
        ScopeArea::Inventory,
        ScopeArea::Restocks,
    ];
    for area in areas {
        println!("{:?}", area);
        for def in REGISTRY.iter().filter(|def| def.area == area) {
            println!("  {:<28} {}", def.scope.as_str(), def.description);
        }
    }
}
