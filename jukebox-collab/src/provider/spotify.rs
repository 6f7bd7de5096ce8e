use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{CurrentTrack, Database, Provider, ProviderConfig, ProviderError, TokenStore, TrackSummary};

/// How many results a search asks the provider for
const SEARCH_LIMIT: usize = 10;

/// How long any provider call may take before it is abandoned
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A typed wrapper around the Spotify web API, issuing calls with the
/// host's stored credential.
pub struct SpotifyClient<Db> {
    tokens: Arc<TokenStore<Db>>,
    http: Client,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    album: AlbumRef,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumRef {
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PlayingResponse {
    item: Option<PlayingItem>,
    progress_ms: Option<u64>,
    #[serde(default)]
    is_playing: bool,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    id: String,
    name: String,
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    album: AlbumRef,
}

impl<Db> SpotifyClient<Db>
where
    Db: Database,
{
    pub fn new(tokens: &Arc<TokenStore<Db>>, config: ProviderConfig) -> Self {
        Self {
            tokens: tokens.clone(),
            http: Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .expect("http client is initialized"),
            config,
        }
    }

    /// The single entry point every derived operation goes through.
    ///
    /// Resolves the host's credential, performs the authenticated call, and
    /// returns the parsed body. An empty body becomes a synthetic
    /// `{"Status": "Success"}` marker so callers can branch uniformly.
    async fn call(
        &self,
        host: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, ProviderError> {
        let credential = self
            .tokens
            .get(host)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
            .ok_or(ProviderError::NoCredential)?;

        let url = format!("{}/{}", self.config.api_base, endpoint);

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&credential.access_token);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthExpired);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if bytes.is_empty() {
            return Ok(json!({ "Status": "Success" }));
        }

        serde_json::from_slice(&bytes).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl<Db> Provider for SpotifyClient<Db>
where
    Db: Database,
{
    async fn search(&self, host: &str, query: &str) -> Vec<TrackSummary> {
        let query = query.trim();

        if query.is_empty() {
            return vec![];
        }

        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let endpoint = format!("search?q={encoded}&type=track&limit={SEARCH_LIMIT}");

        match self.call(host, Method::GET, &endpoint, None).await {
            Ok(value) => summaries_from_search(value),
            Err(e) => {
                debug!("Search for {query:?} degraded to empty: {e}");
                vec![]
            }
        }
    }

    async fn enqueue(&self, host: &str, uri: &str) -> Result<(), ProviderError> {
        let encoded: String = url::form_urlencoded::byte_serialize(uri.as_bytes()).collect();

        self.call(host, Method::POST, &format!("me/player/queue?uri={encoded}"), None)
            .await
            .map(|_| ())
    }

    async fn currently_playing(&self, host: &str) -> Result<CurrentTrack, ProviderError> {
        let value = self
            .call(host, Method::GET, "me/player/currently-playing", None)
            .await?;

        current_track_from_playing(value)
    }

    async fn pause(&self, host: &str) -> Result<(), ProviderError> {
        self.call(host, Method::PUT, "me/player/pause", None)
            .await
            .map(|_| ())
    }

    async fn resume(&self, host: &str) -> Result<(), ProviderError> {
        self.call(host, Method::PUT, "me/player/play", None)
            .await
            .map(|_| ())
    }

    async fn skip(&self, host: &str) -> Result<(), ProviderError> {
        self.call(host, Method::POST, "me/player/next", None)
            .await
            .map(|_| ())
    }
}

/// Joins all artist names with ", ", the way they are displayed everywhere
fn join_artists(artists: &[ArtistRef]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The first album image is the largest one Spotify offers
fn first_image(album: &AlbumRef) -> Option<String> {
    album.images.first().map(|i| i.url.clone())
}

/// Projects a search response to normalized track summaries.
/// Anything that doesn't look like a track listing becomes an empty list.
fn summaries_from_search(value: Value) -> Vec<TrackSummary> {
    let Ok(response) = serde_json::from_value::<SearchResponse>(value) else {
        return vec![];
    };

    let Some(page) = response.tracks else {
        return vec![];
    };

    page.items
        .into_iter()
        .map(|item| TrackSummary {
            id: item.id,
            title: item.name,
            artist: join_artists(&item.artists),
            uri: item.uri,
            album_art_url: first_image(&item.album),
        })
        .collect()
}

/// Projects a currently-playing response to a [CurrentTrack], treating a
/// missing item (no active device, empty-body marker) as nothing playing.
fn current_track_from_playing(value: Value) -> Result<CurrentTrack, ProviderError> {
    let response: PlayingResponse = serde_json::from_value(value)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let item = response.item.ok_or(ProviderError::NothingPlaying)?;

    Ok(CurrentTrack {
        id: item.id,
        title: item.name,
        artist: join_artists(&item.artists),
        duration_ms: item.duration_ms,
        progress_ms: response.progress_ms,
        album_art_url: first_image(&item.album),
        is_playing: response.is_playing,
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::json;

    use super::{current_track_from_playing, summaries_from_search, SpotifyClient};
    use crate::{MemoryDatabase, Provider, ProviderConfig, ProviderError, TokenStore};

    #[tokio::test]
    async fn empty_queries_never_reach_the_provider() {
        let db = Arc::new(MemoryDatabase::default());

        // An unroutable API base: any call that leaves the process fails
        let mut config = ProviderConfig::new(
            "client".to_string(),
            "secret".to_string(),
            "http://localhost/callback".to_string(),
        );
        config.api_base = "http://127.0.0.1:1".to_string();

        let tokens = Arc::new(TokenStore::new(&db, config.clone()));
        tokens
            .upsert(
                "host",
                "access".to_string(),
                "Bearer".to_string(),
                3600,
                Some("refresh".to_string()),
            )
            .await
            .unwrap();

        let client = SpotifyClient::new(&tokens, config);

        assert!(client.search("host", "").await.is_empty());
        assert!(client.search("host", "   ").await.is_empty());
    }

    #[test]
    fn search_results_are_normalized() {
        let response = json!({
            "tracks": {
                "items": [
                    {
                        "id": "track-1",
                        "name": "First",
                        "uri": "spotify:track:track-1",
                        "artists": [{ "name": "A" }, { "name": "B" }],
                        "album": { "images": [{ "url": "http://img/large" }, { "url": "http://img/small" }] }
                    },
                    {
                        "id": "track-2",
                        "name": "Second",
                        "uri": "spotify:track:track-2",
                        "artists": [{ "name": "Solo" }],
                        "album": { "images": [] }
                    }
                ]
            }
        });

        let summaries = summaries_from_search(response);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].artist, "A, B");
        assert_eq!(summaries[0].album_art_url.as_deref(), Some("http://img/large"));
        assert_eq!(summaries[1].artist, "Solo");
        assert_eq!(summaries[1].album_art_url, None);
    }

    #[test]
    fn search_without_a_track_listing_is_empty() {
        assert!(summaries_from_search(json!({ "error": "oh no" })).is_empty());
        assert!(summaries_from_search(json!({ "Status": "Success" })).is_empty());
    }

    #[test]
    fn playing_response_is_projected() {
        let response = json!({
            "item": {
                "id": "abc",
                "name": "Song",
                "duration_ms": 200_000,
                "artists": [{ "name": "X" }, { "name": "Y" }],
                "album": { "images": [{ "url": "http://img" }] }
            },
            "progress_ms": 1234,
            "is_playing": true
        });

        let track = current_track_from_playing(response).unwrap();

        assert_eq!(track.id, "abc");
        assert_eq!(track.artist, "X, Y");
        assert_eq!(track.duration_ms, 200_000);
        assert_eq!(track.progress_ms, Some(1234));
        assert!(track.is_playing);
    }

    #[test]
    fn empty_body_marker_means_nothing_playing() {
        let result = current_track_from_playing(json!({ "Status": "Success" }));

        assert!(matches!(result, Err(ProviderError::NothingPlaying)));
    }
}
