/// Everything the jukebox needs to talk to the music provider.
///
/// Constructed explicitly by the binary and passed into the token store and
/// provider client. Nothing in this crate reads ambient configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// OAuth2 client id of the registered application
    pub client_id: String,
    /// OAuth2 client secret of the registered application
    pub client_secret: String,
    /// Where the provider sends the user after the consent screen
    pub redirect_uri: String,
    /// Base URL of the provider's web API
    pub api_base: String,
    /// The provider's OAuth2 token endpoint
    pub token_url: String,
    /// The provider's OAuth2 consent page
    pub auth_url: String,
}

impl ProviderConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.spotify.com/v1";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://accounts.spotify.com/api/token";
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.spotify.com/authorize";

    /// Creates a config for the real provider endpoints
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
        }
    }
}
