mod config;
mod currency;
mod db;
mod errors;
mod front;
mod migration;
pub mod models;
mod report;

use anyhow::Context;
use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init_from_env(Env::default().default_filter_or("obras=debug"))?;

    let config = config::Config::load()?;
    log::info!(
        "database {}, uploads in {}",
        config.database_url,
        config.upload_dir.display()
    );

    let db = db::Database::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    migration::migrate(db.pool(), &config.migrations_dir).await?;
    front::ensure_admin(&db, &config).await?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating {}", config.upload_dir.display()))?;

    let state = front::AppState::new(db, config)?;
    front::start_web_server(state).await
}
