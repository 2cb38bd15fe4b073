// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Resolve config, validate the database pool, serve, drain on signal

mod config;
mod errors;
mod handlers;
mod middleware;
mod services;

use config::Config;
use dotenv::dotenv;
use services::{shutdown_signal, Application};

#[actix_web::main]
async fn main() {
    // 1. Load .env (optional; real environment variables and flags suffice)
    let env_file = dotenv();

    // 2. Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,actix_web=info,sqlx=warn"),
    )
    .init();

    log::info!("Starting greenlight-api v{}...", env!("CARGO_PKG_VERSION"));
    match env_file {
        Ok(path) => log::info!("Loaded environment file {}", path.display()),
        Err(e) => log::warn!("No .env file loaded ({}); using process environment", e),
    }

    // 3. Resolve configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Trusted CORS origins: {}",
        config.trusted_origins.iter().collect::<Vec<_>>().join(", ")
    );

    // 4. Initialize database connection pool
    let app = match Application::bootstrap(config).await {
        Ok(app) => app,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    // 5. Serve until SIGINT/SIGTERM, then drain and release
    if let Err(e) = app.serve_until(shutdown_signal()).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
