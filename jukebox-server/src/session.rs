use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jukebox_collab::RoomData;

use crate::{context::ServerContext, errors::ServerResult, ServerError};

/// The header the hosting frontend supplies the caller's session under
const SESSION_HEADER: &str = "x-session-id";

/// The header the identity provider supplies the authenticated user under
const USER_HEADER: &str = "x-forwarded-user";

/// The opaque per-caller session every request carries.
/// This is all the identity a guest ever has.
pub struct Caller {
    pub session: String,
}

/// An authenticated host identity, required for account-linked endpoints
pub struct HostUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|x| x.to_str().ok())
            .filter(|x| !x.is_empty())
            .ok_or((StatusCode::BAD_REQUEST, "Missing session identifier"))?;

        Ok(Self {
            session: session.to_string(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HostUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|x| x.to_str().ok())
            .filter(|x| !x.is_empty())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authenticated identity"))?;

        Ok(Self(user.to_string()))
    }
}

/// Resolves the room a caller's session is bound to, or a not-found error
/// when the session isn't in any room.
pub async fn bound_room(context: &ServerContext, caller: &Caller) -> ServerResult<RoomData> {
    let binding = context
        .jukebox
        .sessions
        .binding_of(&caller.session)
        .await?
        .ok_or(ServerError::NotFound {
            resource: "room",
            identifier: "session",
        })?;

    Ok(context.jukebox.rooms.room_by_code(&binding.room_code).await?)
}
