use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the raw OpenAPI document.
pub mod docs;
/// Health check route.
pub mod health;
/// Caller identity extraction.
pub mod identity;
/// Presence and battle projections.
pub mod public;
/// Room listing, creation, join and teardown.
pub mod rooms;
/// Server-sent event feeds.
pub mod sse;
/// Websocket upgrade.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(rooms::router())
        .merge(public::router())
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
