use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report live counters, degraded when the song catalog does not answer.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().len();
    let online = state.presence_service().online_count();

    match state.catalog().health_check().await {
        Ok(()) => HealthResponse::ok(rooms, online),
        Err(err) => {
            warn!(error = %err, "song catalog health check failed");
            HealthResponse::degraded(rooms, online)
        }
    }
}
