mod config;
mod db;
mod provider;
mod rooms;
mod sessions;
mod tokens;
mod util;
mod votes;

use std::sync::Arc;

pub use config::*;
pub use db::*;
pub use provider::*;
pub use rooms::*;
pub use sessions::*;
pub use tokens::*;
pub use votes::*;

/// The jukebox collab system, coordinating rooms, skip votes, sessions, and
/// the music provider on the hosts' behalf.
pub struct Jukebox<Db, P> {
    pub tokens: Arc<TokenStore<Db>>,
    pub provider: Arc<P>,

    pub rooms: RoomRegistry<Db>,
    pub votes: VoteCoordinator<Db, P>,
    pub sessions: SessionBindings<Db>,
}

impl<Db, P> Jukebox<Db, P>
where
    Db: Database,
    P: Provider,
{
    pub fn new(database: &Arc<Db>, tokens: &Arc<TokenStore<Db>>, provider: P) -> Self {
        let provider = Arc::new(provider);

        Self {
            tokens: tokens.clone(),
            rooms: RoomRegistry::new(database),
            votes: VoteCoordinator::new(database, &provider),
            sessions: SessionBindings::new(database),
            provider,
        }
    }

    /// Joins a session into a room by code.
    ///
    /// An unknown code leaves the session unbound.
    pub async fn join_room(
        &self,
        session: &str,
        code: &str,
    ) -> std::result::Result<RoomData, RoomError> {
        let room = self.rooms.room_by_code(code).await?;

        self.sessions
            .bind(session, &room.code)
            .await
            .map_err(RoomError::Db)?;

        Ok(room)
    }
}
