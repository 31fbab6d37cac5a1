//! sja-daemon entry point.
//!
//! Thin by design: load config, connect and migrate the database, build the
//! router from `sja-api`, wire middleware, and serve. All route handlers and
//! shared state live in `sja-api`.

use std::sync::Arc;

use anyhow::Context;
use sja_api::{routes, AppState};
use sja_daemon::{cors_layer, init_tracing};
use sja_db::DbPool;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = sja_config::Config::from_env().context("load configuration")?;
    let bind_addr = config.bind_addr;
    let cors = cors_layer(&config);

    let pool = DbPool::connect(config.database_url.as_deref(), &config.embedded_db_path)
        .await
        .context("connect to database")?;
    pool.migrate().await.context("run database migrations")?;

    let state = Arc::new(AppState::new(config, pool));
    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    ).layer(cors);

    info!("sja-daemon listening on http://{}", bind_addr);

    axum::serve(tokio::net::TcpListener::bind(bind_addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}
