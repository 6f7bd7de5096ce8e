use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use jukebox_collab::{Provider, TrackSummary};
use serde::Deserialize;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{QueueSchema, ValidatedJson},
    serialized::{ToSerialized, Track},
    session::{bound_room, Caller},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

/// Searches the provider for tracks on the room host's behalf.
/// An empty query is an empty result, not an error.
pub async fn search(
    State(context): State<ServerContext>,
    caller: Caller,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<Vec<Track>>> {
    let room = bound_room(&context, &caller).await?;

    let results = context
        .jukebox
        .provider
        .search(&room.host, params.query.as_deref().unwrap_or_default())
        .await;

    Ok(Json(results.to_serialized()))
}

/// Adds a track to the host's live queue and records who queued it
pub async fn queue(
    State(context): State<ServerContext>,
    caller: Caller,
    ValidatedJson(body): ValidatedJson<QueueSchema>,
) -> ServerResult<StatusCode> {
    let room = bound_room(&context, &caller).await?;

    context.jukebox.provider.enqueue(&room.host, &body.uri).await?;

    context
        .jukebox
        .rooms
        .record_queued_track(
            &room,
            &caller.session,
            TrackSummary {
                id: body.id,
                title: body.title,
                artist: body.artist,
                uri: body.uri,
                album_art_url: body.album_art_url,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
