use async_trait::async_trait;
use thiserror::Error;

mod spotify;
pub use spotify::*;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The host never linked a provider account, so no call was made
    #[error("No credential stored for this host")]
    NoCredential,

    /// The provider rejected the stored access token
    #[error("Provider authorization expired")]
    AuthExpired,

    /// The provider could not be reached, or timed out
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something that couldn't be parsed
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// No active device, or playback is stopped
    #[error("Nothing is playing")]
    NothingPlaying,
}

/// A track as returned from a provider search
#[derive(Debug, Clone)]
pub struct TrackSummary {
    /// The provider id of the track
    pub id: String,
    pub title: String,
    /// All artists joined by ", "
    pub artist: String,
    /// The provider URI used to enqueue the track
    pub uri: String,
    pub album_art_url: Option<String>,
}

/// The track currently playing on the host's account.
///
/// Vote counts are deliberately absent here; tallying is the vote
/// coordinator's job and is joined in by the API surface.
#[derive(Debug, Clone)]
pub struct CurrentTrack {
    /// The provider id of the track, which votes are cast against
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    pub progress_ms: Option<u64>,
    pub album_art_url: Option<String>,
    pub is_playing: bool,
}

/// The playback and search surface of the external music provider.
///
/// Implemented over HTTP by [SpotifyClient]; the vote coordinator and the
/// server are generic over it so tests can count calls instead.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Searches the provider for tracks. Degrades to an empty list on any
    /// failure, and never touches the network for an empty query.
    async fn search(&self, host: &str, query: &str) -> Vec<TrackSummary>;

    /// Adds a track to the live playback queue of the host's account
    async fn enqueue(&self, host: &str, uri: &str) -> Result<(), ProviderError>;

    /// Returns what is currently playing on the host's account
    async fn currently_playing(&self, host: &str) -> Result<CurrentTrack, ProviderError>;

    async fn pause(&self, host: &str) -> Result<(), ProviderError>;
    async fn resume(&self, host: &str) -> Result<(), ProviderError>;
    async fn skip(&self, host: &str) -> Result<(), ProviderError>;
}

#[cfg(test)]
pub mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{CurrentTrack, Provider, ProviderError, TrackSummary};

    /// A provider that plays whatever the test tells it to and counts calls
    #[derive(Default)]
    pub struct FakeProvider {
        pub playing: Mutex<Option<CurrentTrack>>,
        pub skips: AtomicUsize,
        pub pauses: AtomicUsize,
        pub resumes: AtomicUsize,
        pub enqueued: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        pub fn playing_track(id: &str) -> CurrentTrack {
            CurrentTrack {
                id: id.to_string(),
                title: format!("Track {id}"),
                artist: "Somebody".to_string(),
                duration_ms: 180_000,
                progress_ms: Some(5_000),
                album_art_url: None,
                is_playing: true,
            }
        }

        pub fn now_playing(&self, id: &str) {
            *self.playing.lock() = Some(Self::playing_track(id));
        }

        pub fn skip_count(&self) -> usize {
            self.skips.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        async fn search(&self, _host: &str, query: &str) -> Vec<TrackSummary> {
            if query.is_empty() {
                return vec![];
            }

            vec![TrackSummary {
                id: "result".to_string(),
                title: query.to_string(),
                artist: "Somebody".to_string(),
                uri: format!("spotify:track:{query}"),
                album_art_url: None,
            }]
        }

        async fn enqueue(&self, _host: &str, uri: &str) -> Result<(), ProviderError> {
            self.enqueued.lock().push(uri.to_string());
            Ok(())
        }

        async fn currently_playing(&self, _host: &str) -> Result<CurrentTrack, ProviderError> {
            self.playing
                .lock()
                .clone()
                .ok_or(ProviderError::NothingPlaying)
        }

        async fn pause(&self, _host: &str) -> Result<(), ProviderError> {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self, _host: &str) -> Result<(), ProviderError> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn skip(&self, _host: &str) -> Result<(), ProviderError> {
            self.skips.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
