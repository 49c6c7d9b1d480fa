/// Battle channel operations with snapshot publishing.
pub mod battle_service;
/// Routing of decoded inbound events to the controllers.
pub mod dispatch;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Room lifecycle state machine driver.
pub mod lifecycle_service;
/// Presence tracking with online/offline announcements.
pub mod presence_service;
/// Read-only projections for the public routes.
pub mod public_service;
/// Relay payload construction and publishing.
pub mod relay_events;
/// Room creation and explicit join/teardown.
pub mod room_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
