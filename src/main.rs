//! Collaborative CRDT document server: a relay that fans inserts and
//! deletes out to connected peers, backed by the fractional-position CRDT
//! in this crate (see `SPEC_FULL.md`).

use scribe::config::Config;
use scribe::document::Document;
use scribe::relay::{router, AppState};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();
    let doc = Arc::new(RwLock::new(Document::new()));
    let app = router(AppState::new(doc))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind((config.addr.as_str(), config.port)).await?;
    info!(addr = %config.addr, port = config.port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
