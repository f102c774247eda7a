use actix_web::web::Data;
use log::{error, info};
use std::path::Path;
use std::sync::Arc;

mod config;
mod core;
mod db;
mod models;
mod services;
mod web;

use crate::config::AppConfig;
use crate::core::mailer::build_mailer;
use crate::db::Database;
use crate::services::{auth, users};
use crate::web::server::{start_web_server, AppState};

/// Open the database, seed the admin account and assemble shared state
async fn bootstrap(config: &AppConfig) -> Result<Data<AppState>, Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open(Path::new(&config.database_path))?);
    info!("Database ready at {}", config.database_path);

    {
        let conn = db.lock().await;
        let purged = auth::purge_expired_sessions(&conn)?;
        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        if let Some(seed) = &config.admin_seed {
            users::ensure_admin(&conn, seed)?;
        }
    }

    let mailer = build_mailer(&config.smtp)?;
    let state = AppState::new(config, db, mailer);
    state.uploads.ensure_dir().await?;
    info!("Uploads stored in {}", state.uploads.dir().display());

    Ok(Data::new(state))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting MySE Portfolio server v{}...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    let state = match bootstrap(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let web_server_handle = tokio::spawn(start_web_server(config, state));

    info!("Portfolio server is now running. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    info!("Shutting down portfolio server...");
    web_server_handle.abort();
    match web_server_handle.await {
        Ok(Err(e)) => error!("Web server stopped with an error: {}", e),
        Err(e) if !e.is_cancelled() => error!("Error during web server shutdown: {:?}", e),
        _ => {}
    }

    info!("Portfolio server shutdown complete");
}
