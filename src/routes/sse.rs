use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/presence",
    tag = "sse",
    responses((status = 200, description = "Presence SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream online-set changes.
pub async fn presence_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("new presence SSE connection");
    sse_service::to_sse_stream(sse_service::subscribe_presence(&state))
}

#[utoipa::path(
    get,
    path = "/sse/rooms/{id}",
    tag = "sse",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Room not found")
    )
)]
/// Stream state, all-ready, start and score events of one room.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let feed = sse_service::subscribe_room(&state, &id)?;
    info!(room_id = %id, "new room SSE connection");
    Ok(sse_service::to_sse_stream(feed))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/presence", get(presence_stream))
        .route("/sse/rooms/{id}", get(room_stream))
}
