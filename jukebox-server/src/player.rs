use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json,
};
use jukebox_collab::{Provider, ProviderError, Role};
use serde_json::json;

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    serialized::CurrentSong,
    session::{bound_room, Caller},
    Router,
};

/// What is currently playing in the caller's room, joined with the skip-vote
/// tally. Responds with no content when the host's playback is idle.
async fn current(State(context): State<ServerContext>, caller: Caller) -> ServerResult<Response> {
    let room = bound_room(&context, &caller).await?;

    let track = match context.jukebox.provider.currently_playing(&room.host).await {
        Ok(track) => track,
        Err(ProviderError::NothingPlaying) => {
            context
                .jukebox
                .rooms
                .remember_current_song(&room.code, None)
                .await?;

            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let votes = context.jukebox.votes.tally(&room, &track.id).await?;

    context
        .jukebox
        .rooms
        .remember_current_song(&room.code, Some(format!("{} - {}", track.artist, track.title)))
        .await?;

    Ok(Json(CurrentSong::of(track, votes, room.votes_to_skip)).into_response())
}

/// Pauses playback. Allowed for the host, and for guests when the room
/// permits it.
async fn pause(State(context): State<ServerContext>, caller: Caller) -> ServerResult<StatusCode> {
    let room = bound_room(&context, &caller).await?;
    let role = context.jukebox.sessions.role_of(&caller.session, &room);

    if role != Role::Host && !room.guest_can_pause {
        return Err(ServerError::PermissionDenied);
    }

    context.jukebox.provider.pause(&room.host).await?;

    if role == Role::Host {
        context.jukebox.rooms.touch_activity(&room.code).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Resumes playback, with the same permission rule as pause
async fn play(State(context): State<ServerContext>, caller: Caller) -> ServerResult<StatusCode> {
    let room = bound_room(&context, &caller).await?;
    let role = context.jukebox.sessions.role_of(&caller.session, &room);

    if role != Role::Host && !room.guest_can_pause {
        return Err(ServerError::PermissionDenied);
    }

    context.jukebox.provider.resume(&room.host).await?;

    if role == Role::Host {
        context.jukebox.rooms.touch_activity(&room.code).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Skips the current track outright. Host session only; guests go through
/// the vote endpoint instead.
async fn skip(State(context): State<ServerContext>, caller: Caller) -> ServerResult<StatusCode> {
    let room = bound_room(&context, &caller).await?;

    if context.jukebox.sessions.role_of(&caller.session, &room) != Role::Host {
        return Err(ServerError::PermissionDenied);
    }

    context.jukebox.provider.skip(&room.host).await?;
    context.jukebox.rooms.touch_activity(&room.code).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Casts a skip vote against whatever is playing right now.
///
/// The current track id is fetched from the provider immediately before the
/// vote is registered, so the tally is always counted against the live track.
pub async fn vote(State(context): State<ServerContext>, caller: Caller) -> ServerResult<Response> {
    let room = bound_room(&context, &caller).await?;

    let track = match context.jukebox.provider.currently_playing(&room.host).await {
        Ok(track) => track,
        Err(ProviderError::NothingPlaying) => {
            return Ok(Json(json!({ "status": "nothing playing" })).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    context
        .jukebox
        .votes
        .register_vote(&room, &caller.session, &track.id)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub fn router() -> Router {
    Router::new()
        .route("/current", get(current))
        .route("/pause", put(pause))
        .route("/play", put(play))
        .route("/skip", post(skip))
}
