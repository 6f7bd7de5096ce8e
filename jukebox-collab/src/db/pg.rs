use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, PgPool};

use crate::{
    BindingData, CredentialData, Database, DatabaseError, IntoDatabaseError, NewCredential,
    NewRoom, NewTrack, NewVote, PrimaryKey, Result, RoomData, TrackData, VoteTally,
};

/// A postgres database implementation for the jukebox.
///
/// The expected schema lives in `schema.sql` at the crate root.
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn credential_by_owner(&self, owner: &str) -> Result<CredentialData> {
        query_as::<_, CredentialData>("SELECT * FROM credentials WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("credential", "owner"))
    }

    async fn upsert_credential(&self, new_credential: NewCredential) -> Result<CredentialData> {
        query_as::<_, CredentialData>(
            "INSERT INTO credentials (owner, access_token, refresh_token, token_type, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (owner) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_type = EXCLUDED.token_type,
                expires_at = EXCLUDED.expires_at
             RETURNING *",
        )
        .bind(&new_credential.owner)
        .bind(&new_credential.access_token)
        .bind(&new_credential.refresh_token)
        .bind(&new_credential.token_type)
        .bind(new_credential.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn room_by_code(&self, code: &str) -> Result<RoomData> {
        query_as::<_, RoomData>("SELECT * FROM rooms WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "code"))
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        query_as::<_, RoomData>(
            "INSERT INTO rooms (code, host, host_session, guest_can_pause, votes_to_skip)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&new_room.code)
        .bind(&new_room.host)
        .bind(&new_room.host_session)
        .bind(new_room.guest_can_pause)
        .bind(new_room.votes_to_skip)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            SqlxError::Database(e) if e.is_unique_violation() => DatabaseError::Conflict {
                resource: "room",
                field: "code",
                value: new_room.code.clone(),
            },
            e => e.any(),
        })
    }

    async fn update_room_settings(
        &self,
        code: &str,
        guest_can_pause: bool,
        votes_to_skip: i32,
    ) -> Result<RoomData> {
        query_as::<_, RoomData>(
            "UPDATE rooms SET guest_can_pause = $1, votes_to_skip = $2 WHERE code = $3
             RETURNING *",
        )
        .bind(guest_can_pause)
        .bind(votes_to_skip)
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("room", "code"))
    }

    async fn touch_room_activity(&self, code: &str, at: DateTime<Utc>) -> Result<()> {
        let result = query("UPDATE rooms SET last_host_activity = $1 WHERE code = $2")
            .bind(at)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        updated_or_not_found(result.rows_affected())
    }

    async fn set_current_song(&self, code: &str, label: Option<String>) -> Result<()> {
        let result = query("UPDATE rooms SET current_song = $1 WHERE code = $2")
            .bind(label)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        updated_or_not_found(result.rows_affected())
    }

    async fn delete_room(&self, code: &str) -> Result<()> {
        // Ensure room exists
        let room = self.room_by_code(code).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("DELETE FROM bindings WHERE room_code = $1")
            .bind(&room.code)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        // Tracks and votes cascade via their room_id foreign keys
        query("DELETE FROM rooms WHERE id = $1")
            .bind(room.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        query_as::<_, TrackData>(
            "INSERT INTO tracks (room_id, added_by, title, artist, uri, album_art_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(new_track.room_id)
        .bind(&new_track.added_by)
        .bind(&new_track.title)
        .bind(&new_track.artist)
        .bind(&new_track.uri)
        .bind(&new_track.album_art_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn tracks_by_room(&self, room_id: PrimaryKey) -> Result<Vec<TrackData>> {
        query_as::<_, TrackData>("SELECT * FROM tracks WHERE room_id = $1 ORDER BY added_at")
            .bind(room_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn register_vote(&self, new_vote: NewVote, votes_required: i32) -> Result<VoteTally> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Serializes concurrent registrations on the same room's vote set,
        // so only one of them can observe the threshold crossing
        query("SELECT pg_advisory_xact_lock($1)")
            .bind(new_vote.room_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        // Lazy reset: votes against any other track in this room are stale
        query("DELETE FROM votes WHERE room_id = $1 AND track_id <> $2")
            .bind(new_vote.room_id)
            .bind(&new_vote.track_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query(
            "INSERT INTO votes (room_id, voter, track_id) VALUES ($1, $2, $3)
             ON CONFLICT (room_id, voter, track_id) DO NOTHING",
        )
        .bind(new_vote.room_id)
        .bind(&new_vote.voter)
        .bind(&new_vote.track_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        let count: i64 =
            query_scalar("SELECT COUNT(*) FROM votes WHERE room_id = $1 AND track_id = $2")
                .bind(new_vote.room_id)
                .bind(&new_vote.track_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| e.any())?;

        let threshold_reached = count >= votes_required as i64;

        if threshold_reached {
            query("DELETE FROM votes WHERE room_id = $1 AND track_id = $2")
                .bind(new_vote.room_id)
                .bind(&new_vote.track_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| e.any())?;
        }

        tx.commit().await.map_err(|e| e.any())?;

        Ok(VoteTally {
            count,
            threshold_reached,
        })
    }

    async fn count_votes(&self, room_id: PrimaryKey, track_id: &str) -> Result<i64> {
        query_scalar("SELECT COUNT(*) FROM votes WHERE room_id = $1 AND track_id = $2")
            .bind(room_id)
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn bind_session(&self, session: &str, room_code: &str) -> Result<BindingData> {
        query_as::<_, BindingData>(
            "INSERT INTO bindings (session, room_code) VALUES ($1, $2)
             ON CONFLICT (session) DO UPDATE SET room_code = EXCLUDED.room_code
             RETURNING *",
        )
        .bind(session)
        .bind(room_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn binding_by_session(&self, session: &str) -> Result<BindingData> {
        query_as::<_, BindingData>("SELECT * FROM bindings WHERE session = $1")
            .bind(session)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("binding", "session"))
    }
}

/// An UPDATE that matched no rows means the room doesn't exist
fn updated_or_not_found(rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFound {
            resource: "room",
            identifier: "code",
        });
    }

    Ok(())
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
