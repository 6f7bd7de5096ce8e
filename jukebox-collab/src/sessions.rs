use std::sync::Arc;

use crate::{BindingData, Database, DatabaseError, RoomData};

/// What a caller is allowed to do inside a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// Maps opaque caller sessions to the room they are in.
///
/// This binding is the sole authorization mechanism for transport control
/// and settings; there is no password and no token beyond session identity.
pub struct SessionBindings<Db> {
    db: Arc<Db>,
}

impl<Db> SessionBindings<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Binds a session to a room, replacing any previous binding.
    /// A caller is only ever in one room at a time.
    pub async fn bind(&self, session: &str, room_code: &str) -> Result<BindingData, DatabaseError> {
        self.db.bind_session(session, room_code).await
    }

    /// Returns the room binding of a session, if it has one
    pub async fn binding_of(&self, session: &str) -> Result<Option<BindingData>, DatabaseError> {
        match self.db.binding_by_session(session).await {
            Ok(binding) => Ok(Some(binding)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A session is the host exactly when it is the one the room was
    /// created with; everyone else is a guest.
    pub fn role_of(&self, session: &str, room: &RoomData) -> Role {
        if room.host_session == session {
            Role::Host
        } else {
            Role::Guest
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{Role, SessionBindings};
    use crate::{MemoryDatabase, RoomRegistry, RoomSettings};

    #[tokio::test]
    async fn binding_is_exclusive_per_session() {
        let db = Arc::new(MemoryDatabase::default());
        let bindings = SessionBindings::new(&db);

        bindings.bind("caller", "AAAA").await.unwrap();
        bindings.bind("caller", "BBBB").await.unwrap();

        let binding = bindings.binding_of("caller").await.unwrap().unwrap();
        assert_eq!(binding.room_code, "BBBB");
    }

    #[tokio::test]
    async fn unbound_sessions_have_no_binding() {
        let db = Arc::new(MemoryDatabase::default());
        let bindings = SessionBindings::new(&db);

        assert!(bindings.binding_of("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn the_creating_session_is_the_host() {
        let db = Arc::new(MemoryDatabase::default());
        let bindings = SessionBindings::new(&db);
        let rooms = RoomRegistry::new(&db);

        let room = rooms
            .create_room(
                "host-user",
                "host-session",
                RoomSettings {
                    guest_can_pause: true,
                    votes_to_skip: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(bindings.role_of("host-session", &room), Role::Host);
        assert_eq!(bindings.role_of("guest-session", &room), Role::Guest);
    }
}
