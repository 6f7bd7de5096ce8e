use std::sync::Arc;

use axum::extract::FromRef;
use jukebox_collab::{Jukebox, PgDatabase, SpotifyClient};

/// The concrete types the server binary runs with
pub type AppDatabase = PgDatabase;
pub type AppProvider = SpotifyClient<AppDatabase>;
pub type AppJukebox = Jukebox<AppDatabase, AppProvider>;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub jukebox: Arc<AppJukebox>,
}
