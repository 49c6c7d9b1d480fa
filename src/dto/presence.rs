use serde::Serialize;
use utoipa::ToSchema;

use crate::state::UserId;

/// Users currently holding at least one live connection.
#[derive(Debug, Serialize, ToSchema)]
pub struct PresenceSnapshot {
    /// Online user ids, sorted.
    pub online: Vec<UserId>,
    /// Number of online users.
    pub count: usize,
}

impl From<Vec<UserId>> for PresenceSnapshot {
    fn from(online: Vec<UserId>) -> Self {
        Self {
            count: online.len(),
            online,
        }
    }
}
