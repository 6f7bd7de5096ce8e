use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json,
};
use jukebox_collab::{Role, RoomData, RoomSettings};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{JoinRoomSchema, NewRoomSchema, ValidatedJson},
    serialized::{QueuedTrack, Room, ToSerialized},
    session::{Caller, HostUser},
    Router,
};

fn serialize_for(context: &ServerContext, caller: &Caller, room: RoomData) -> Room {
    let host_online = context.jukebox.rooms.is_host_online(&room);
    let is_host = context.jukebox.sessions.role_of(&caller.session, &room) == Role::Host;

    Room::of(room, host_online, is_host)
}

/// Creates a room owned by the authenticated host and binds the creating
/// session to it as the host session.
async fn create_room(
    State(context): State<ServerContext>,
    caller: Caller,
    HostUser(host): HostUser,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<(StatusCode, Json<Room>)> {
    let room = context
        .jukebox
        .rooms
        .create_room(
            &host,
            &caller.session,
            RoomSettings {
                guest_can_pause: body.guest_can_pause,
                votes_to_skip: body.votes_to_skip,
            },
        )
        .await?;

    context.jukebox.sessions.bind(&caller.session, &room.code).await?;

    Ok((
        StatusCode::CREATED,
        Json(serialize_for(&context, &caller, room)),
    ))
}

/// Joins the calling session into a room by code
async fn join_room(
    State(context): State<ServerContext>,
    caller: Caller,
    ValidatedJson(body): ValidatedJson<JoinRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context.jukebox.join_room(&caller.session, &body.code).await?;

    Ok(Json(serialize_for(&context, &caller, room)))
}

async fn room_by_code(
    State(context): State<ServerContext>,
    caller: Caller,
    Path(code): Path<String>,
) -> ServerResult<Json<Room>> {
    let room = context.jukebox.rooms.room_by_code(&code).await?;

    Ok(Json(serialize_for(&context, &caller, room)))
}

/// Applies new settings to a room. Host session only.
async fn update_settings(
    State(context): State<ServerContext>,
    caller: Caller,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context.jukebox.rooms.room_by_code(&code).await?;

    if context.jukebox.sessions.role_of(&caller.session, &room) != Role::Host {
        return Err(ServerError::PermissionDenied);
    }

    let room = context
        .jukebox
        .rooms
        .update_settings(
            &code,
            &room.host,
            RoomSettings {
                guest_can_pause: body.guest_can_pause,
                votes_to_skip: body.votes_to_skip,
            },
        )
        .await?;

    Ok(Json(serialize_for(&context, &caller, room)))
}

/// Lists the tracks queued into a room so far, oldest first
async fn queued_tracks(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<Vec<QueuedTrack>>> {
    let room = context.jukebox.rooms.room_by_code(&code).await?;
    let tracks = context.jukebox.rooms.queued_tracks(&room).await?;

    Ok(Json(tracks.to_serialized()))
}

/// Closes a room, cascading away its tracks, votes, and bindings.
/// Host session only.
async fn close_room(
    State(context): State<ServerContext>,
    caller: Caller,
    Path(code): Path<String>,
) -> ServerResult<StatusCode> {
    let room = context.jukebox.rooms.room_by_code(&code).await?;

    if context.jukebox.sessions.role_of(&caller.session, &room) != Role::Host {
        return Err(ServerError::PermissionDenied);
    }

    context.jukebox.rooms.close(&code, &room.host).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_room))
        .route("/join", post(join_room))
        .route("/:code", get(room_by_code))
        .route("/:code/tracks", get(queued_tracks))
        .route("/:code", patch(update_settings))
        .route("/:code", delete(close_room))
}
