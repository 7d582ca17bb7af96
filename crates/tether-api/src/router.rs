//! Route table.

use crate::{handlers, AppState};
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the handoff API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/desktop/initiate", post(handlers::initiate))
        .route("/auth/desktop/exchange", post(handlers::exchange))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
