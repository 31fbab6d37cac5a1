//! Process bootstrap helpers shared by `main.rs` and the scenario tests:
//! tracing init and the CORS layer built from `Config::cors_origins`.

use axum::http::{HeaderValue, Method};
use sja_config::Config;
use tower_http::cors::CorsLayer;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Builds the CORS layer from the configured allow-list (spec §4.9).
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
