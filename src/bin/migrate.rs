use anyhow::{anyhow, Context, Result};
use art_studio_bot::config::database_url_from_env;
use art_studio_bot::database::connection::{sqlite_file_path, DatabaseManager};
use std::io::{self, Write};
use std::path::Path;

const REQUIRED_TABLES: [&str; 2] = ["activities", "signups"];

const USAGE: &str = "\
🎨 Art Studio Bot schema tool

USAGE:
    migrate [up | check | reset | help]

COMMANDS:
    up, migrate    Apply pending migrations (default)
    check          Connect and list the schema tables
    reset          Drop the SQLite file and rebuild it (asks first)
    help           Print this text

ENVIRONMENT:
    DATABASE_URL   Connection string, defaults to sqlite:./data/studio.db
";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env();
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    match command.as_str() {
        "up" | "migrate" => migrate(&database_url).await,
        "check" => check(&database_url).await,
        "reset" => reset(&database_url).await,
        "help" | "--help" | "-h" => {
            print!("{USAGE}");
            Ok(())
        }
        other => {
            eprintln!("Unknown command '{other}'\n");
            eprint!("{USAGE}");
            std::process::exit(2);
        }
    }
}

async fn connect(database_url: &str) -> Result<DatabaseManager> {
    println!("📊 {}", display_url(database_url));
    DatabaseManager::new(database_url)
        .await
        .with_context(|| "Could not open the studio database")
}

async fn migrate(database_url: &str) -> Result<()> {
    let db = connect(database_url).await?;
    println!("🚀 Applying migrations...");
    if let Err(e) = db.run_migrations().await {
        eprintln!("❌ Migration failed: {e}");
        std::process::exit(1);
    }
    println!("✅ Schema is up to date");
    Ok(())
}

async fn check(database_url: &str) -> Result<()> {
    let db = connect(database_url).await?;

    let tables: Vec<String> =
        match sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&db.pool)
            .await
        {
            Ok(tables) => tables,
            Err(e) => {
                println!("⚠️  Could not read the schema: {e}");
                return Ok(());
            }
        };

    println!("📋 Tables: {}", tables.join(", "));
    let missing: Vec<&str> = REQUIRED_TABLES
        .into_iter()
        .filter(|required| !tables.iter().any(|t| t == required))
        .collect();
    if missing.is_empty() {
        println!("✅ Schema looks complete");
    } else {
        println!("⚠️  Missing {}; run 'migrate up'", missing.join(", "));
    }
    Ok(())
}

async fn reset(database_url: &str) -> Result<()> {
    let path = sqlite_file_path(database_url)
        .ok_or_else(|| anyhow!("reset only works on a SQLite file database"))?;

    print!("⚠️  Every activity and sign-up in {path} will be lost. Type 'yes' to go on: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    if !answer.trim().eq_ignore_ascii_case("yes") {
        println!("Nothing was changed.");
        return Ok(());
    }

    if Path::new(path).exists() {
        std::fs::remove_file(path).with_context(|| format!("Could not remove {path}"))?;
        println!("🗑️  Removed {path}");
    }
    migrate(database_url).await
}

fn display_url(url: &str) -> String {
    sqlite_file_path(url)
        .and_then(|p| Path::new(p).file_name())
        .map(|name| format!("sqlite:.../{}", name.to_string_lossy()))
        .unwrap_or_else(|| url.to_string())
}
