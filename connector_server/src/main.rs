//! Connector server: loads the descriptor, introspects the database and serves the resource API.
//!
//! Run from repo root: `cargo run -p connector-server`

use tokio::net::TcpListener;
use workflow_connector::{
    common_routes_with_ready, connector_routes, load_from_path, AppState, Database, Settings,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("workflow_connector=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let descriptor = load_from_path(&settings.descriptor_path)?;
    let db = Database::connect(settings.backend, &settings.database_url, settings.max_connections).await?;
    let state = AppState::initialize(db, descriptor).await?;

    let app = common_routes_with_ready(state.clone()).merge(connector_routes(state));
    let listener = TcpListener::bind(settings.listen_addr).await?;
    tracing::info!(
        backend = settings.backend.as_str(),
        "connector listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
