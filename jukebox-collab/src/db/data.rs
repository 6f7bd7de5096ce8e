use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// An opaque identity supplied by the identity provider fronting the server.
pub type UserId = String;

/// An opaque per-caller session identifier supplied with every request.
pub type SessionId = String;

/// A stored OAuth2 token set enabling provider calls on a host's behalf.
///
/// There is exactly one credential per owner, and it is only ever replaced
/// wholesale by a token upsert.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialData {
    /// The host identity this credential belongs to
    pub owner: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Always an absolute instant, never a relative duration
    pub expires_at: DateTime<Utc>,
}

/// A jukebox room
#[derive(Debug, Clone, FromRow)]
pub struct RoomData {
    pub id: PrimaryKey,
    /// The 4-character join code, unique among all rooms
    pub code: String,
    /// The identity that owns the room and whose credential drives playback
    pub host: UserId,
    /// The session the host created the room with, used for role resolution
    pub host_session: SessionId,
    pub guest_can_pause: bool,
    pub votes_to_skip: i32,
    pub is_active: bool,
    /// Updated on every host-originated write, drives the liveness check
    pub last_host_activity: DateTime<Utc>,
    /// Cached label of whatever was last seen playing in this room
    pub current_song: Option<String>,
}

/// A record of a track that was added to the room's queue
#[derive(Debug, Clone, FromRow)]
pub struct TrackData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    /// The session that queued the track
    pub added_by: SessionId,
    pub title: String,
    /// All artists joined by ", "
    pub artist: String,
    /// The provider URI, e.g. `spotify:track:xxxx`
    pub uri: String,
    pub album_art_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A skip vote against the track currently playing in a room.
/// Note: `room_id`, `voter`, and `track_id` are unique together.
#[derive(Debug, Clone, FromRow)]
pub struct VoteData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub voter: SessionId,
    /// The provider id of the track the vote was cast against
    pub track_id: String,
    pub created_at: DateTime<Utc>,
}

/// Maps a caller session to the room it is currently in
#[derive(Debug, Clone, FromRow)]
pub struct BindingData {
    pub session: SessionId,
    pub room_code: String,
}

#[derive(Debug)]
pub struct NewCredential {
    pub owner: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewRoom {
    pub code: String,
    pub host: UserId,
    pub host_session: SessionId,
    pub guest_can_pause: bool,
    pub votes_to_skip: i32,
}

#[derive(Debug)]
pub struct NewTrack {
    pub room_id: PrimaryKey,
    pub added_by: SessionId,
    pub title: String,
    pub artist: String,
    pub uri: String,
    pub album_art_url: Option<String>,
}

#[derive(Debug)]
pub struct NewVote {
    pub room_id: PrimaryKey,
    pub voter: SessionId,
    pub track_id: String,
}

/// The outcome of an atomic vote registration
#[derive(Debug, Clone, Copy)]
pub struct VoteTally {
    /// The vote count for the current track after registration
    pub count: i64,
    /// Whether this registration crossed the skip threshold.
    /// The store clears the tracked votes in the same atomic step when it did,
    /// so at most one concurrent registration observes the crossing.
    pub threshold_reached: bool,
}
