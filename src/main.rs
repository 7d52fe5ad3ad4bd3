use actix_web::{middleware, web, App, HttpServer};
use medi_reach::{db, handlers, AppState, Config};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting Medi-Reach...");

    let config = Config::load()?;

    let pool = db::init_db(&config.database_url).await?;

    if config.seed_db {
        db::seed::seed_database(&pool, &config.admin_email, &config.admin_password).await?;
    }

    let bind_address = config.bind_address();
    let state = web::Data::new(AppState::new(pool, config));

    log::info!("Listening on {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    log::info!("Shutting down gracefully");
    Ok(())
}
