//! Caller identity supplied by the upstream identity provider.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, state::Identity};

/// Header carrying the verified user identifier.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Optional header carrying the display name.
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Identity resolved from request headers; requests without one get a 401.
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub Identity);

impl<S> FromRequestParts<S> for VerifiedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("login required".into()))?;
        let name = header(USER_NAME_HEADER).unwrap_or_else(|| user_id.clone());

        Ok(VerifiedUser(Identity::new(user_id, name)))
    }
}
