use url::Url;

use crate::error::Error;

const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1/";

fn default_url(raw: &'static str) -> Url {
    Url::parse(raw).expect("valid default URL")
}

/// Spotify accounts configuration owned by the embedding application.
///
/// Required fields are constructor parameters. Endpoints default to the
/// public accounts service and Web API.
///
/// ```rust,ignore
/// use spotify_auth::OAuthConfig;
///
/// let config = OAuthConfig::new("my-client-id", "myapp://callback")
///     .with_scopes(vec!["user-read-email".into()])
///     .with_campaign("spring-launch");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) redirect_uri: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) api_url: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) campaign: Option<String>,
    pub(crate) show_dialog: bool,
}

impl OAuthConfig {
    /// The redirect URI is kept as given; it is validated when a request is built.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: default_url(DEFAULT_AUTH_URL),
            token_url: default_url(DEFAULT_TOKEN_URL),
            api_url: default_url(DEFAULT_API_URL),
            scopes: Vec::new(),
            campaign: None,
            show_dialog: false,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Required env vars
    /// - `SPOTIFY_CLIENT_ID`: application client ID
    /// - `SPOTIFY_REDIRECT_URI`: registered redirect URI (e.g. `myapp://callback`)
    ///
    /// # Optional env vars
    /// - `SPOTIFY_AUTH_URL`: override the authorize endpoint
    /// - `SPOTIFY_TOKEN_URL`: override the token endpoint
    /// - `SPOTIFY_API_URL`: override the Web API base URL
    /// - `SPOTIFY_SCOPES`: comma-separated scopes
    /// - `SPOTIFY_CAMPAIGN`: campaign tag reported as `utm_campaign`
    /// - `SPOTIFY_SHOW_DIALOG`: `"1"` or `"true"` to force the consent dialog
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a required variable is missing or a URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let client_id = lookup("SPOTIFY_CLIENT_ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidConfig("SPOTIFY_CLIENT_ID is required".into()))?;
        let redirect_uri = lookup("SPOTIFY_REDIRECT_URI")
            .ok_or_else(|| Error::InvalidConfig("SPOTIFY_REDIRECT_URI is required".into()))?;
        parse_url("SPOTIFY_REDIRECT_URI", &redirect_uri)?;

        let mut config = Self::new(client_id, redirect_uri);

        if let Some(raw) = lookup("SPOTIFY_AUTH_URL") {
            config = config.with_auth_url(parse_url("SPOTIFY_AUTH_URL", &raw)?);
        }
        if let Some(raw) = lookup("SPOTIFY_TOKEN_URL") {
            config = config.with_token_url(parse_url("SPOTIFY_TOKEN_URL", &raw)?);
        }
        if let Some(raw) = lookup("SPOTIFY_API_URL") {
            config = config.with_api_url(parse_url("SPOTIFY_API_URL", &raw)?);
        }
        if let Some(scopes) = lookup("SPOTIFY_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        if let Some(campaign) = lookup("SPOTIFY_CAMPAIGN").filter(|c| !c.is_empty()) {
            config = config.with_campaign(campaign);
        }
        let show_dialog = matches!(
            lookup("SPOTIFY_SHOW_DIALOG").as_deref(),
            Some("1") | Some("true"),
        );

        Ok(config.with_show_dialog(show_dialog))
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the Web API base URL that relative endpoints resolve against.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    #[must_use]
    pub fn with_show_dialog(mut self, show_dialog: bool) -> Self {
        self.show_dialog = show_dialog;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    #[must_use]
    pub fn show_dialog(&self) -> bool {
        self.show_dialog
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, Error> {
    raw.parse()
        .map_err(|e| Error::InvalidConfig(format!("{var}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_public_service() {
        let config = OAuthConfig::new("my-app", "myapp://callback");

        assert_eq!(config.client_id(), "my-app");
        assert_eq!(config.redirect_uri(), "myapp://callback");
        assert_eq!(config.auth_url().as_str(), DEFAULT_AUTH_URL);
        assert_eq!(config.token_url().as_str(), DEFAULT_TOKEN_URL);
        assert_eq!(config.api_url().as_str(), DEFAULT_API_URL);
        assert!(config.scopes().is_empty());
        assert!(config.campaign().is_none());
        assert!(!config.show_dialog());
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = OAuthConfig::from_lookup(lookup_from(&[
            ("SPOTIFY_CLIENT_ID", "abc123"),
            ("SPOTIFY_REDIRECT_URI", "myapp://callback"),
            ("SPOTIFY_API_URL", "http://localhost:9000/v1/"),
            ("SPOTIFY_SCOPES", "user-read-email, playlist-read-private,"),
            ("SPOTIFY_CAMPAIGN", "camp1"),
            ("SPOTIFY_SHOW_DIALOG", "true"),
        ]))
        .unwrap();

        assert_eq!(config.client_id(), "abc123");
        assert_eq!(config.api_url().as_str(), "http://localhost:9000/v1/");
        assert_eq!(config.scopes(), &["user-read-email", "playlist-read-private"]);
        assert_eq!(config.campaign(), Some("camp1"));
        assert!(config.show_dialog());
    }

    #[test]
    fn from_lookup_keeps_redirect_uri_verbatim() {
        let config = OAuthConfig::from_lookup(lookup_from(&[
            ("SPOTIFY_CLIENT_ID", "abc123"),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8888"),
        ]))
        .unwrap();
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:8888");
    }

    #[test]
    fn from_lookup_requires_client_id() {
        let err = OAuthConfig::from_lookup(lookup_from(&[(
            "SPOTIFY_REDIRECT_URI",
            "myapp://callback",
        )]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn from_lookup_rejects_bad_url() {
        let err = OAuthConfig::from_lookup(lookup_from(&[
            ("SPOTIFY_CLIENT_ID", "abc123"),
            ("SPOTIFY_REDIRECT_URI", "not a url"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SPOTIFY_REDIRECT_URI"));
    }
}
