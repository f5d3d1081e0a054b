//! HTTP server bootstrap.

use anyhow::Result;
use tracing::info;

use crate::api::{AppState, create_router};

/// Start the auth service on the given bind address,
/// e.g. `127.0.0.1:8080` or `0.0.0.0:8080`.
pub async fn start_http(state: AppState, bind: &str) -> Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    info!("linkgate listening on http://{}", bind);

    axum::serve(listener, router).await?;

    Ok(())
}
