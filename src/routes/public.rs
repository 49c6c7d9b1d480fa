use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::{battle::BattleSnapshot, presence::PresenceSnapshot},
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints for presence and battle channels.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/presence", get(get_presence))
        .route("/battles/{id}", get(get_battle))
}

#[utoipa::path(
    get,
    path = "/presence",
    tag = "public",
    responses((status = 200, description = "Users currently online", body = PresenceSnapshot))
)]
/// Return the users holding at least one live connection.
pub async fn get_presence(State(state): State<SharedState>) -> Json<PresenceSnapshot> {
    Json(public_service::online_users(&state))
}

#[utoipa::path(
    get,
    path = "/battles/{id}",
    tag = "public",
    params(("id" = String, Path, description = "Battle channel identifier")),
    responses((status = 200, description = "Battle channel state", body = BattleSnapshot))
)]
/// Return the participants, spectators and playing flag of a battle channel.
pub async fn get_battle(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<BattleSnapshot> {
    Json(public_service::get_battle(&state, &id))
}
