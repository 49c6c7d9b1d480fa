use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of live rooms.
    pub rooms: usize,
    /// Number of users holding at least one connection.
    pub online_users: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(rooms: usize, online_users: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            online_users,
        }
    }

    /// Create a health response indicating the song catalog is unreachable.
    pub fn degraded(rooms: usize, online_users: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            rooms,
            online_users,
        }
    }
}
