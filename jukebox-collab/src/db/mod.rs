use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can store and fetch jukebox data.
///
/// Every operation is a single atomically-visible step against the shared
/// store, which is what the vote coordinator relies on for its exactly-once
/// skip guarantee.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn credential_by_owner(&self, owner: &str) -> Result<CredentialData>;
    /// Creates or replaces the single credential for its owner
    async fn upsert_credential(&self, new_credential: NewCredential) -> Result<CredentialData>;

    async fn room_by_code(&self, code: &str) -> Result<RoomData>;
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    async fn update_room_settings(
        &self,
        code: &str,
        guest_can_pause: bool,
        votes_to_skip: i32,
    ) -> Result<RoomData>;
    async fn touch_room_activity(&self, code: &str, at: DateTime<Utc>) -> Result<()>;
    async fn set_current_song(&self, code: &str, label: Option<String>) -> Result<()>;
    /// Deletes a room along with its tracks, votes, and session bindings
    async fn delete_room(&self, code: &str) -> Result<()>;

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData>;
    async fn tracks_by_room(&self, room_id: PrimaryKey) -> Result<Vec<TrackData>>;

    /// Registers a skip vote in one atomic step: purges votes for any other
    /// track in the room, inserts the vote unless the voter already cast it,
    /// counts the result, and clears the vote set when the count reaches
    /// `votes_required`.
    async fn register_vote(&self, new_vote: NewVote, votes_required: i32) -> Result<VoteTally>;
    async fn count_votes(&self, room_id: PrimaryKey, track_id: &str) -> Result<i64>;

    /// Binds a session to a room, replacing any previous binding
    async fn bind_session(&self, session: &str, room_code: &str) -> Result<BindingData>;
    async fn binding_by_session(&self, session: &str) -> Result<BindingData>;
}
