use std::{env, sync::Arc};

use jukebox_collab::{
    DatabaseError, Jukebox, PgDatabase, ProviderConfig, SpotifyClient, TokenStore,
};
use jukebox_server::{logging, run_server, ServerContext};
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
enum StartError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not initialize database: {0}")]
    Database(DatabaseError),
}

impl StartError {
    fn hint(&self) -> String {
        match self {
            StartError::Config(_) => {
                "Set the missing environment variable and try again.".to_string()
            }
            StartError::Database(_) => {
                "Make sure the Postgres instance is running and DATABASE_URL points at it, then try again."
                    .to_string()
            }
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = start().await {
        error!("Jukebox failed to start! Read the error below to troubleshoot the issue.");
        error!("{}", error);
        error!("Hint: {}", error.hint());
    }
}

async fn start() -> Result<(), StartError> {
    let database_url = required("DATABASE_URL")?;

    let provider_config = ProviderConfig::new(
        required("SPOTIFY_CLIENT_ID")?,
        required("SPOTIFY_CLIENT_SECRET")?,
        required("SPOTIFY_REDIRECT_URI")?,
    );

    info!("Connecting to database...");

    let database = Arc::new(
        PgDatabase::new(&database_url)
            .await
            .map_err(StartError::Database)?,
    );

    let tokens = Arc::new(TokenStore::new(&database, provider_config.clone()));
    let spotify = SpotifyClient::new(&tokens, provider_config);
    let jukebox = Arc::new(Jukebox::new(&database, &tokens, spotify));

    info!("Initialized successfully.");

    run_server(ServerContext { jukebox }).await;

    Ok(())
}

fn required(name: &str) -> Result<String, StartError> {
    env::var(name).map_err(|_| StartError::Config(format!("{name} is not set")))
}
