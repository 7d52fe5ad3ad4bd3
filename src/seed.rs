use medi_reach::{db, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::load()?;
    let pool = db::init_db(&config.database_url).await?;

    if db::seed::seed_database(&pool, &config.admin_email, &config.admin_password).await? {
        log::info!("Seed data written to {}", config.database_url);
    }

    Ok(())
}
