use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Beat Arena backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::close_room,
        crate::routes::public::get_presence,
        crate::routes::public::get_battle,
        crate::routes::sse::presence_stream,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::RoomListResponse,
            crate::dto::room::SongSnapshot,
            crate::dto::room::PlayerSnapshot,
            crate::dto::phase::VisibleRoomPhase,
            crate::dto::presence::PresenceSnapshot,
            crate::dto::battle::BattleSnapshot,
            crate::dto::battle::BattleParticipantSnapshot,
            crate::dto::events::AllReadyEvent,
            crate::dto::events::StartEvent,
            crate::dto::events::ScoreEvent,
            crate::dto::events::SignalEvent,
            crate::dto::events::SignalKind,
            crate::dto::events::RoomClosedEvent,
            crate::dto::ws::InboundMessage,
            crate::dto::ws::DirectReply,
            crate::dto::ws::JoinRejection,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Multiplayer room discovery and management"),
        (name = "public", description = "Presence and battle channel projections"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "realtime", description = "WebSocket transport for players"),
    )
)]
pub struct ApiDoc;
