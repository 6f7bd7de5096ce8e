use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::{Database, DatabaseError, NewVote, Provider, RoomData};

/// Tallies skip votes per room and track, and pulls the trigger when a
/// room's threshold is reached.
pub struct VoteCoordinator<Db, P> {
    db: Arc<Db>,
    provider: Arc<P>,
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// The vote state after a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The tally is below the threshold
    Accumulating { count: i64, required: i32 },
    /// This vote crossed the threshold: a skip was requested and the tally
    /// was reset
    Skipped,
}

impl<Db, P> VoteCoordinator<Db, P>
where
    Db: Database,
    P: Provider,
{
    pub fn new(db: &Arc<Db>, provider: &Arc<P>) -> Self {
        Self {
            db: db.clone(),
            provider: provider.clone(),
        }
    }

    /// Registers a skip vote against the track currently playing in a room.
    ///
    /// The caller supplies the authoritative current track id, fetched from
    /// the provider immediately beforehand; votes against anything else are
    /// purged as stale in the same atomic store step. Casting the same vote
    /// twice is idempotent.
    ///
    /// The store serializes registrations per room, so even when two votes
    /// cross the threshold simultaneously only one of them observes the
    /// crossing and only one skip is requested.
    pub async fn register_vote(
        &self,
        room: &RoomData,
        voter: &str,
        current_track_id: &str,
    ) -> Result<VoteOutcome, VoteError> {
        let tally = self
            .db
            .register_vote(
                NewVote {
                    room_id: room.id,
                    voter: voter.to_string(),
                    track_id: current_track_id.to_string(),
                },
                room.votes_to_skip,
            )
            .await?;

        if !tally.threshold_reached {
            return Ok(VoteOutcome::Accumulating {
                count: tally.count,
                required: room.votes_to_skip,
            });
        }

        info!(
            "Room {} reached {} votes, skipping current track",
            room.code, tally.count
        );

        // The tally is already reset at this point. A failed skip is logged
        // and swallowed: at human interaction rates the next track change or
        // vote round recovers the state.
        if let Err(e) = self.provider.skip(&room.host).await {
            warn!("Skip for room {} failed: {e}", room.code);
        }

        Ok(VoteOutcome::Skipped)
    }

    /// The current tally for a track, without registering anything
    pub async fn tally(&self, room: &RoomData, current_track_id: &str) -> Result<i64, VoteError> {
        Ok(self.db.count_votes(room.id, current_track_id).await?)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{VoteCoordinator, VoteOutcome};
    use crate::provider::fake::FakeProvider;
    use crate::{Database, MemoryDatabase, RoomData, RoomRegistry, RoomSettings};

    struct Fixture {
        db: Arc<MemoryDatabase>,
        provider: Arc<FakeProvider>,
        votes: VoteCoordinator<MemoryDatabase, FakeProvider>,
        room: RoomData,
    }

    async fn fixture(votes_to_skip: i32) -> Fixture {
        let db = Arc::new(MemoryDatabase::default());
        let provider = Arc::new(FakeProvider::default());

        let room = RoomRegistry::new(&db)
            .create_room(
                "host",
                "host-session",
                RoomSettings {
                    guest_can_pause: false,
                    votes_to_skip,
                },
            )
            .await
            .unwrap();

        Fixture {
            votes: VoteCoordinator::new(&db, &provider),
            db,
            provider,
            room,
        }
    }

    #[tokio::test]
    async fn votes_are_idempotent_per_voter_and_track() {
        let f = fixture(3).await;

        let first = f.votes.register_vote(&f.room, "guest", "track-1").await.unwrap();
        let second = f.votes.register_vote(&f.room, "guest", "track-1").await.unwrap();

        assert_eq!(first, VoteOutcome::Accumulating { count: 1, required: 3 });
        assert_eq!(second, VoteOutcome::Accumulating { count: 1, required: 3 });
        assert_eq!(f.provider.skip_count(), 0);
    }

    #[tokio::test]
    async fn reaching_the_threshold_skips_exactly_once_and_resets() {
        let f = fixture(3).await;

        for guest in ["a", "b"] {
            let outcome = f.votes.register_vote(&f.room, guest, "track-1").await.unwrap();
            assert!(matches!(outcome, VoteOutcome::Accumulating { .. }));
        }

        let outcome = f.votes.register_vote(&f.room, "c", "track-1").await.unwrap();

        assert_eq!(outcome, VoteOutcome::Skipped);
        assert_eq!(f.provider.skip_count(), 1);
        assert_eq!(f.db.count_votes(f.room.id, "track-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn a_vote_after_the_reset_starts_a_fresh_tally() {
        let f = fixture(3).await;

        for guest in ["a", "b", "c"] {
            f.votes.register_vote(&f.room, guest, "track-1").await.unwrap();
        }
        assert_eq!(f.provider.skip_count(), 1);

        let outcome = f.votes.register_vote(&f.room, "d", "track-1").await.unwrap();

        assert_eq!(outcome, VoteOutcome::Accumulating { count: 1, required: 3 });
        assert_eq!(f.provider.skip_count(), 1);
    }

    #[tokio::test]
    async fn a_track_change_purges_the_old_tally() {
        let f = fixture(3).await;

        f.votes.register_vote(&f.room, "a", "track-1").await.unwrap();
        f.votes.register_vote(&f.room, "b", "track-1").await.unwrap();

        // The live track changed; the next registration supplies the new id
        let outcome = f.votes.register_vote(&f.room, "a", "track-2").await.unwrap();

        assert_eq!(outcome, VoteOutcome::Accumulating { count: 1, required: 3 });
        assert_eq!(f.db.count_votes(f.room.id, "track-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_vote_threshold_skips_immediately() {
        let f = fixture(1).await;

        let outcome = f.votes.register_vote(&f.room, "only", "track-1").await.unwrap();

        assert_eq!(outcome, VoteOutcome::Skipped);
        assert_eq!(f.provider.skip_count(), 1);
    }

    #[tokio::test]
    async fn tally_reads_do_not_mutate() {
        let f = fixture(3).await;

        f.votes.register_vote(&f.room, "a", "track-1").await.unwrap();

        assert_eq!(f.votes.tally(&f.room, "track-1").await.unwrap(), 1);
        assert_eq!(f.votes.tally(&f.room, "track-1").await.unwrap(), 1);
    }
}
