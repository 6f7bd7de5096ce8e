use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    BindingData, CredentialData, Database, DatabaseError, NewCredential, NewRoom, NewTrack,
    NewVote, PrimaryKey, Result, RoomData, TrackData, VoteData, VoteTally,
};

/// An in-memory database implementation, used by tests and local development.
///
/// A single lock around the whole state makes every operation atomically
/// visible, including the purge-insert-count step of [register_vote].
///
/// [register_vote]: Database::register_vote
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    credentials: HashMap<String, CredentialData>,
    rooms: Vec<RoomData>,
    tracks: Vec<TrackData>,
    votes: Vec<VoteData>,
    bindings: HashMap<String, String>,
    next_id: PrimaryKey,
}

impl State {
    fn next_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn room_index(&self, code: &str) -> Result<usize> {
        self.rooms
            .iter()
            .position(|r| r.code == code)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "code",
            })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn credential_by_owner(&self, owner: &str) -> Result<CredentialData> {
        self.state
            .lock()
            .credentials
            .get(owner)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "credential",
                identifier: "owner",
            })
    }

    async fn upsert_credential(&self, new_credential: NewCredential) -> Result<CredentialData> {
        let credential = CredentialData {
            owner: new_credential.owner.clone(),
            access_token: new_credential.access_token,
            refresh_token: new_credential.refresh_token,
            token_type: new_credential.token_type,
            expires_at: new_credential.expires_at,
        };

        self.state
            .lock()
            .credentials
            .insert(new_credential.owner, credential.clone());

        Ok(credential)
    }

    async fn room_by_code(&self, code: &str) -> Result<RoomData> {
        let state = self.state.lock();
        let index = state.room_index(code)?;

        Ok(state.rooms[index].clone())
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut state = self.state.lock();

        if state.room_index(&new_room.code).is_ok() {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "code",
                value: new_room.code,
            });
        }

        let room = RoomData {
            id: state.next_id(),
            code: new_room.code,
            host: new_room.host,
            host_session: new_room.host_session,
            guest_can_pause: new_room.guest_can_pause,
            votes_to_skip: new_room.votes_to_skip,
            is_active: true,
            last_host_activity: Utc::now(),
            current_song: None,
        };

        state.rooms.push(room.clone());
        Ok(room)
    }

    async fn update_room_settings(
        &self,
        code: &str,
        guest_can_pause: bool,
        votes_to_skip: i32,
    ) -> Result<RoomData> {
        let mut state = self.state.lock();
        let index = state.room_index(code)?;

        let room = &mut state.rooms[index];
        room.guest_can_pause = guest_can_pause;
        room.votes_to_skip = votes_to_skip;

        Ok(room.clone())
    }

    async fn touch_room_activity(&self, code: &str, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock();
        let index = state.room_index(code)?;

        state.rooms[index].last_host_activity = at;
        Ok(())
    }

    async fn set_current_song(&self, code: &str, label: Option<String>) -> Result<()> {
        let mut state = self.state.lock();
        let index = state.room_index(code)?;

        state.rooms[index].current_song = label;
        Ok(())
    }

    async fn delete_room(&self, code: &str) -> Result<()> {
        let mut state = self.state.lock();
        let index = state.room_index(code)?;
        let room = state.rooms.remove(index);

        state.tracks.retain(|t| t.room_id != room.id);
        state.votes.retain(|v| v.room_id != room.id);
        state.bindings.retain(|_, bound| *bound != room.code);

        Ok(())
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        let mut state = self.state.lock();

        let track = TrackData {
            id: state.next_id(),
            room_id: new_track.room_id,
            added_by: new_track.added_by,
            title: new_track.title,
            artist: new_track.artist,
            uri: new_track.uri,
            album_art_url: new_track.album_art_url,
            added_at: Utc::now(),
        };

        state.tracks.push(track.clone());
        Ok(track)
    }

    async fn tracks_by_room(&self, room_id: PrimaryKey) -> Result<Vec<TrackData>> {
        let tracks = self
            .state
            .lock()
            .tracks
            .iter()
            .filter(|t| t.room_id == room_id)
            .cloned()
            .collect();

        Ok(tracks)
    }

    async fn register_vote(&self, new_vote: NewVote, votes_required: i32) -> Result<VoteTally> {
        let mut state = self.state.lock();

        // Lazy reset: votes against any other track in this room are stale
        state
            .votes
            .retain(|v| v.room_id != new_vote.room_id || v.track_id == new_vote.track_id);

        let already_cast = state.votes.iter().any(|v| {
            v.room_id == new_vote.room_id
                && v.voter == new_vote.voter
                && v.track_id == new_vote.track_id
        });

        if !already_cast {
            let vote = VoteData {
                id: state.next_id(),
                room_id: new_vote.room_id,
                voter: new_vote.voter.clone(),
                track_id: new_vote.track_id.clone(),
                created_at: Utc::now(),
            };

            state.votes.push(vote);
        }

        let count = state
            .votes
            .iter()
            .filter(|v| v.room_id == new_vote.room_id && v.track_id == new_vote.track_id)
            .count() as i64;

        let threshold_reached = count >= votes_required as i64;

        if threshold_reached {
            state
                .votes
                .retain(|v| v.room_id != new_vote.room_id || v.track_id != new_vote.track_id);
        }

        Ok(VoteTally {
            count,
            threshold_reached,
        })
    }

    async fn count_votes(&self, room_id: PrimaryKey, track_id: &str) -> Result<i64> {
        let count = self
            .state
            .lock()
            .votes
            .iter()
            .filter(|v| v.room_id == room_id && v.track_id == track_id)
            .count();

        Ok(count as i64)
    }

    async fn bind_session(&self, session: &str, room_code: &str) -> Result<BindingData> {
        self.state
            .lock()
            .bindings
            .insert(session.to_string(), room_code.to_string());

        Ok(BindingData {
            session: session.to_string(),
            room_code: room_code.to_string(),
        })
    }

    async fn binding_by_session(&self, session: &str) -> Result<BindingData> {
        self.state
            .lock()
            .bindings
            .get(session)
            .map(|code| BindingData {
                session: session.to_string(),
                room_code: code.clone(),
            })
            .ok_or(DatabaseError::NotFound {
                resource: "binding",
                identifier: "session",
            })
    }
}
