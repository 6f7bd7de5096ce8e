use std::sync::Arc;

use chrono::Utc;
use log::info;
use thiserror::Error;

use crate::{
    util::random_code, Database, DatabaseError, DatabaseResult, NewRoom, NewTrack, RoomData,
    TrackData, TrackSummary,
};

/// The length of every room join code
pub const CODE_LENGTH: usize = 4;

/// How long after the last host-originated write a host counts as online
const HOST_OFFLINE_AFTER_SECS: i64 = 180;

/// Creates and owns jukebox rooms, and answers questions about them.
pub struct RoomRegistry<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room {0} doesn't exist")]
    NotFound(String),

    /// Only the owning host may mutate a room
    #[error("Only the host may do this")]
    PermissionDenied,

    #[error("Invalid room settings: {0}")]
    InvalidSettings(&'static str),

    #[error(transparent)]
    Db(DatabaseError),
}

/// The host-tunable settings of a room
#[derive(Debug, Clone, Copy)]
pub struct RoomSettings {
    pub guest_can_pause: bool,
    pub votes_to_skip: i32,
}

impl RoomSettings {
    fn validated(self) -> Result<Self, RoomError> {
        if self.votes_to_skip < 1 {
            return Err(RoomError::InvalidSettings("votes_to_skip must be at least 1"));
        }

        Ok(self)
    }
}

impl<Db> RoomRegistry<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a room with a freshly drawn unique code.
    ///
    /// Codes are 4 characters from a 36-character alphabet, so against the
    /// handful of concurrently active rooms a collision re-draw is rare.
    pub async fn create_room(
        &self,
        host: &str,
        host_session: &str,
        settings: RoomSettings,
    ) -> Result<RoomData, RoomError> {
        let settings = settings.validated()?;

        let code = loop {
            let candidate = random_code(CODE_LENGTH);

            let available = self
                .db
                .room_by_code(&candidate)
                .await
                .conflict_or_ok("room", "code", &candidate);

            match available {
                Ok(()) => break candidate,
                Err(DatabaseError::Conflict { .. }) => continue,
                Err(e) => return Err(RoomError::Db(e)),
            }
        };

        let room = self
            .db
            .create_room(NewRoom {
                code,
                host: host.to_string(),
                host_session: host_session.to_string(),
                guest_can_pause: settings.guest_can_pause,
                votes_to_skip: settings.votes_to_skip,
            })
            .await
            .map_err(RoomError::Db)?;

        info!("Room {} created by {}", room.code, room.host);

        Ok(room)
    }

    /// Looks up a room by its exact, case-sensitive code
    pub async fn room_by_code(&self, code: &str) -> Result<RoomData, RoomError> {
        self.db.room_by_code(code).await.map_err(|e| match e {
            DatabaseError::NotFound { .. } => RoomError::NotFound(code.to_string()),
            e => RoomError::Db(e),
        })
    }

    /// Applies new settings to a room. Only the owning host may do this.
    pub async fn update_settings(
        &self,
        code: &str,
        host: &str,
        settings: RoomSettings,
    ) -> Result<RoomData, RoomError> {
        let settings = settings.validated()?;
        let room = self.room_by_code(code).await?;

        if room.host != host {
            return Err(RoomError::PermissionDenied);
        }

        let room = self
            .db
            .update_room_settings(code, settings.guest_can_pause, settings.votes_to_skip)
            .await
            .map_err(RoomError::Db)?;

        self.touch_activity(code).await?;

        Ok(room)
    }

    /// Refreshes the room's host-activity timestamp. Called on every
    /// host-originated write.
    pub async fn touch_activity(&self, code: &str) -> Result<(), RoomError> {
        self.db
            .touch_room_activity(code, Utc::now())
            .await
            .map_err(RoomError::Db)
    }

    /// A host counts as online while its last write is recent enough.
    /// Computed on read, there is no background sweep.
    pub fn is_host_online(&self, room: &RoomData) -> bool {
        (Utc::now() - room.last_host_activity).num_seconds() < HOST_OFFLINE_AFTER_SECS
    }

    /// Caches the label of whatever is playing, mirroring it onto the room
    pub async fn remember_current_song(
        &self,
        code: &str,
        label: Option<String>,
    ) -> Result<(), RoomError> {
        self.db
            .set_current_song(code, label)
            .await
            .map_err(RoomError::Db)
    }

    /// Persists the record of a track a caller queued
    pub async fn record_queued_track(
        &self,
        room: &RoomData,
        added_by: &str,
        track: TrackSummary,
    ) -> Result<TrackData, RoomError> {
        self.db
            .create_track(NewTrack {
                room_id: room.id,
                added_by: added_by.to_string(),
                title: track.title,
                artist: track.artist,
                uri: track.uri,
                album_art_url: track.album_art_url,
            })
            .await
            .map_err(RoomError::Db)
    }

    /// Lists the tracks callers have queued into a room, oldest first
    pub async fn queued_tracks(&self, room: &RoomData) -> Result<Vec<TrackData>, RoomError> {
        self.db
            .tracks_by_room(room.id)
            .await
            .map_err(RoomError::Db)
    }

    /// Closes a room, cascading away its tracks, votes, and bindings.
    /// Only the owning host may do this.
    pub async fn close(&self, code: &str, host: &str) -> Result<(), RoomError> {
        let room = self.room_by_code(code).await?;

        if room.host != host {
            return Err(RoomError::PermissionDenied);
        }

        self.db.delete_room(code).await.map_err(RoomError::Db)?;

        info!("Room {} closed", code);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::{RoomError, RoomRegistry, RoomSettings};
    use crate::{Database, MemoryDatabase, TrackSummary};

    fn registry() -> RoomRegistry<MemoryDatabase> {
        RoomRegistry::new(&Arc::new(MemoryDatabase::default()))
    }

    fn settings(votes_to_skip: i32) -> RoomSettings {
        RoomSettings {
            guest_can_pause: false,
            votes_to_skip,
        }
    }

    #[tokio::test]
    async fn created_rooms_have_unique_well_formed_codes() {
        let registry = registry();
        let mut codes = HashSet::new();

        for _ in 0..50 {
            let room = registry
                .create_room("host", "host-session", settings(1))
                .await
                .unwrap();

            assert_eq!(room.code.len(), 4);
            assert!(room
                .code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(room.is_active);
            assert!(codes.insert(room.code));
        }
    }

    #[tokio::test]
    async fn settings_require_at_least_one_vote() {
        let registry = registry();

        let result = registry.create_room("host", "session", settings(0)).await;

        assert!(matches!(result, Err(RoomError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn only_the_host_may_update_settings() {
        let registry = registry();
        let room = registry
            .create_room("host", "host-session", settings(2))
            .await
            .unwrap();

        let denied = registry
            .update_settings(&room.code, "someone-else", settings(5))
            .await;
        assert!(matches!(denied, Err(RoomError::PermissionDenied)));

        let updated = registry
            .update_settings(&room.code, "host", settings(5))
            .await
            .unwrap();
        assert_eq!(updated.votes_to_skip, 5);
    }

    #[tokio::test]
    async fn only_the_host_may_close_a_room() {
        let registry = registry();
        let room = registry
            .create_room("host", "host-session", settings(1))
            .await
            .unwrap();

        let denied = registry.close(&room.code, "guest").await;
        assert!(matches!(denied, Err(RoomError::PermissionDenied)));

        registry.close(&room.code, "host").await.unwrap();

        let gone = registry.room_by_code(&room.code).await;
        assert!(matches!(gone, Err(RoomError::NotFound(_))));
    }

    #[tokio::test]
    async fn host_liveness_is_a_timestamp_window() {
        let registry = registry();
        let mut room = registry
            .create_room("host", "host-session", settings(1))
            .await
            .unwrap();

        assert!(registry.is_host_online(&room));

        room.last_host_activity = Utc::now() - Duration::seconds(181);
        assert!(!registry.is_host_online(&room));

        room.last_host_activity = Utc::now() - Duration::seconds(10);
        assert!(registry.is_host_online(&room));
    }

    #[tokio::test]
    async fn closing_a_room_discards_its_queued_tracks() {
        let registry = registry();
        let room = registry
            .create_room("host", "host-session", settings(1))
            .await
            .unwrap();

        registry
            .record_queued_track(
                &room,
                "guest",
                TrackSummary {
                    id: "track-1".to_string(),
                    title: "Song".to_string(),
                    artist: "Artist".to_string(),
                    uri: "spotify:track:1".to_string(),
                    album_art_url: None,
                },
            )
            .await
            .unwrap();

        let tracks = registry.queued_tracks(&room).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Song");
        assert_eq!(tracks[0].added_by, "guest");

        registry.close(&room.code, "host").await.unwrap();
        assert!(registry.queued_tracks(&room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_to_an_unknown_room_are_errors() {
        let registry = registry();

        assert!(registry.touch_activity("ZZZZ").await.is_err());
        assert!(registry
            .remember_current_song("ZZZZ", Some("X - Y".to_string()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn touching_activity_moves_the_timestamp() {
        let db = Arc::new(MemoryDatabase::default());
        let registry = RoomRegistry::new(&db);

        let room = registry
            .create_room("host", "host-session", settings(1))
            .await
            .unwrap();

        let before = room.last_host_activity;
        registry.touch_activity(&room.code).await.unwrap();

        let after = db.room_by_code(&room.code).await.unwrap().last_host_activity;
        assert!(after >= before);
    }
}
