//! All schemas that are exposed from endpoints are defined here

use serde::Serialize;
use chrono::{DateTime, Utc};
use jukebox_collab::{CurrentTrack, RoomData, TrackData, TrackSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    code: String,
    guest_can_pause: bool,
    votes_to_skip: i32,
    is_active: bool,
    host_online: bool,
    is_host: bool,
    current_song: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: String,
    title: String,
    artist: String,
    uri: String,
    album_art_url: Option<String>,
}

/// A track someone queued into a room, as recorded at queue time
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTrack {
    title: String,
    artist: String,
    uri: String,
    album_art_url: Option<String>,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSong {
    id: String,
    title: String,
    artist: String,
    duration_ms: u64,
    progress_ms: Option<u64>,
    album_art_url: Option<String>,
    is_playing: bool,
    votes: i64,
    votes_required: i32,
}

#[derive(Debug, Serialize)]
pub struct AuthUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub status: bool,
}

impl Room {
    /// Caller-specific view of a room; liveness and role are computed by the
    /// handler since they depend on the clock and the calling session.
    pub fn of(data: RoomData, host_online: bool, is_host: bool) -> Self {
        Self {
            code: data.code,
            guest_can_pause: data.guest_can_pause,
            votes_to_skip: data.votes_to_skip,
            is_active: data.is_active,
            host_online,
            is_host,
            current_song: data.current_song,
        }
    }
}

impl CurrentSong {
    pub fn of(track: CurrentTrack, votes: i64, votes_required: i32) -> Self {
        Self {
            id: track.id,
            title: track.title,
            artist: track.artist,
            duration_ms: track.duration_ms,
            progress_ms: track.progress_ms,
            album_art_url: track.album_art_url,
            is_playing: track.is_playing,
            votes,
            votes_required,
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<QueuedTrack> for TrackData {
    fn to_serialized(&self) -> QueuedTrack {
        QueuedTrack {
            title: self.title.clone(),
            artist: self.artist.clone(),
            uri: self.uri.clone(),
            album_art_url: self.album_art_url.clone(),
            added_at: self.added_at,
        }
    }
}

impl ToSerialized<Track> for TrackSummary {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            uri: self.uri.clone(),
            album_art_url: self.album_art_url.clone(),
        }
    }
}
