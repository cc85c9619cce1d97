// src/main.rs
mod api;
mod config;
mod estimator;
mod extract;
mod geometry;
mod grid;
mod model;
mod scan;
mod search;
mod shape;
mod solver;
mod types;

use config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let engine_config = app_config.engine.clone();

    println!("🚀 Packing estimation service starting...");
    api::start_api_server(api_config, engine_config).await;
}
