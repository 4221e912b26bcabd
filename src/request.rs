use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use crate::config::OAuthConfig;
use crate::error::Error;
use crate::pkce::CODE_CHALLENGE_METHOD;
use crate::types::ResponseType;

/// Campaign reported when the caller did not set one.
pub const DEFAULT_CAMPAIGN: &str = "android-sdk";
const UTM_SOURCE: &str = "spotify-sdk";
const UTM_MEDIUM: &str = "android-sdk";
const SCOPES_SEPARATOR: &str = " ";

/// Query parameter names understood by the accounts service.
pub(crate) mod params {
    pub const CLIENT_ID: &str = "client_id";
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const STATE: &str = "state";
    pub const SCOPE: &str = "scope";
    pub const SHOW_DIALOG: &str = "show_dialog";
    pub const UTM_SOURCE: &str = "utm_source";
    pub const UTM_MEDIUM: &str = "utm_medium";
    pub const UTM_CAMPAIGN: &str = "utm_campaign";
    pub const CODE_CHALLENGE: &str = "code_challenge";
    pub const CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
    pub const ERROR: &str = "error";
    pub const ERROR_DESCRIPTION: &str = "error_description";
    pub const CODE: &str = "code";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const EXPIRES_IN: &str = "expires_in";

    /// Names written by `AuthorizationRequest::to_url` itself.
    pub const RESERVED: &[&str] = &[
        CLIENT_ID,
        RESPONSE_TYPE,
        REDIRECT_URI,
        STATE,
        SCOPE,
        SHOW_DIALOG,
        UTM_SOURCE,
        UTM_MEDIUM,
        UTM_CAMPAIGN,
        CODE_CHALLENGE,
        CODE_CHALLENGE_METHOD,
    ];
}

/// An authorization request for the accounts service. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    client_id: String,
    response_type: ResponseType,
    redirect_uri: String,
    scopes: BTreeSet<String>,
    show_dialog: bool,
    campaign: Option<String>,
    state: Option<String>,
    code_challenge: Option<String>,
    custom_params: BTreeMap<String, String>,
}

impl AuthorizationRequest {
    /// Start building a request. Validation happens in [`AuthorizationRequestBuilder::build`].
    #[must_use]
    pub fn builder(
        client_id: impl Into<String>,
        response_type: ResponseType,
        redirect_uri: impl Into<String>,
    ) -> AuthorizationRequestBuilder {
        AuthorizationRequestBuilder {
            client_id: client_id.into(),
            response_type,
            redirect_uri: redirect_uri.into(),
            scopes: BTreeSet::new(),
            show_dialog: false,
            campaign: None,
            state: None,
            custom_params: BTreeMap::new(),
        }
    }

    /// Builder pre-filled from application configuration.
    #[must_use]
    pub fn from_config(
        config: &OAuthConfig,
        response_type: ResponseType,
    ) -> AuthorizationRequestBuilder {
        let mut builder = Self::builder(
            config.client_id(),
            response_type,
            config.redirect_uri(),
        )
        .scopes(config.scopes().iter().cloned())
        .show_dialog(config.show_dialog());
        if let Some(campaign) = config.campaign() {
            builder = builder.campaign(campaign);
        }
        builder
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Redirect URI exactly as given; the token exchange must repeat it verbatim.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    #[must_use]
    pub fn show_dialog(&self) -> bool {
        self.show_dialog
    }

    /// Campaign tag, falling back to [`DEFAULT_CAMPAIGN`].
    #[must_use]
    pub fn campaign(&self) -> &str {
        self.campaign.as_deref().unwrap_or(DEFAULT_CAMPAIGN)
    }

    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    #[must_use]
    pub fn code_challenge(&self) -> Option<&str> {
        self.code_challenge.as_deref()
    }

    #[must_use]
    pub fn custom_param(&self, key: &str) -> Option<&str> {
        self.custom_params.get(key).map(String::as_str)
    }

    pub(crate) fn with_state(mut self, state: String) -> Self {
        self.state = Some(state);
        self
    }

    pub(crate) fn with_code_challenge(mut self, challenge: String) -> Self {
        self.code_challenge = Some(challenge);
        self
    }

    /// Encode as the authorize URL the external surface should open.
    #[must_use]
    pub fn to_url(&self, auth_url: &Url) -> Url {
        let mut url = auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(params::CLIENT_ID, &self.client_id)
                .append_pair(params::RESPONSE_TYPE, self.response_type.as_str())
                .append_pair(params::REDIRECT_URI, &self.redirect_uri)
                .append_pair(params::SHOW_DIALOG, if self.show_dialog { "true" } else { "false" })
                .append_pair(params::UTM_SOURCE, UTM_SOURCE)
                .append_pair(params::UTM_MEDIUM, UTM_MEDIUM)
                .append_pair(params::UTM_CAMPAIGN, self.campaign());

            if !self.scopes.is_empty() {
                let scope = self
                    .scopes
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(SCOPES_SEPARATOR);
                query.append_pair(params::SCOPE, &scope);
            }
            if let Some(state) = &self.state {
                query.append_pair(params::STATE, state);
            }
            if let Some(challenge) = &self.code_challenge {
                query
                    .append_pair(params::CODE_CHALLENGE_METHOD, CODE_CHALLENGE_METHOD)
                    .append_pair(params::CODE_CHALLENGE, challenge);
            }
            for (key, value) in &self.custom_params {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// Decode an authorize URL produced by [`to_url`](Self::to_url).
    ///
    /// Parameters other than the known ones are kept as custom parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseFailure`] if a required parameter is missing or invalid.
    pub fn from_url(url: &Url) -> Result<Self, Error> {
        let mut client_id = None;
        let mut response_type = None;
        let mut redirect_uri = None;
        let mut scopes = BTreeSet::new();
        let mut show_dialog = false;
        let mut campaign = None;
        let mut state = None;
        let mut code_challenge = None;
        let mut custom_params = BTreeMap::new();

        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                params::CLIENT_ID => client_id = Some(value),
                params::RESPONSE_TYPE => {
                    let parsed = value
                        .parse::<ResponseType>()
                        .map_err(|e| Error::ParseFailure(e.to_string()))?;
                    response_type = Some(parsed);
                }
                params::REDIRECT_URI => {
                    Url::parse(&value)
                        .map_err(|e| Error::ParseFailure(format!("redirect_uri: {e}")))?;
                    redirect_uri = Some(value);
                }
                params::SCOPE => {
                    scopes = value
                        .split(SCOPES_SEPARATOR)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                params::SHOW_DIALOG => show_dialog = value == "true",
                params::UTM_CAMPAIGN => campaign = Some(value).filter(|c| c != DEFAULT_CAMPAIGN),
                params::STATE => state = Some(value),
                params::CODE_CHALLENGE => code_challenge = Some(value),
                params::UTM_SOURCE | params::UTM_MEDIUM | params::CODE_CHALLENGE_METHOD => {}
                other => {
                    custom_params.insert(other.to_owned(), value);
                }
            }
        }

        Ok(Self {
            client_id: client_id.ok_or_else(|| Error::ParseFailure("missing client_id".into()))?,
            response_type: response_type
                .ok_or_else(|| Error::ParseFailure("missing response_type".into()))?,
            redirect_uri: redirect_uri
                .ok_or_else(|| Error::ParseFailure("missing redirect_uri".into()))?,
            scopes,
            show_dialog,
            campaign,
            state,
            code_challenge,
            custom_params,
        })
    }
}

/// Builder for [`AuthorizationRequest`].
#[derive(Debug, Clone)]
#[must_use]
pub struct AuthorizationRequestBuilder {
    client_id: String,
    response_type: ResponseType,
    redirect_uri: String,
    scopes: BTreeSet<String>,
    show_dialog: bool,
    campaign: Option<String>,
    state: Option<String>,
    custom_params: BTreeMap<String, String>,
}

impl AuthorizationRequestBuilder {
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn show_dialog(mut self, show_dialog: bool) -> Self {
        self.show_dialog = show_dialog;
        self
    }

    /// Campaign tag. An empty tag falls back to the default campaign.
    pub fn campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign =
            Some(campaign.into()).filter(|c: &String| !c.is_empty() && c != DEFAULT_CAMPAIGN);
        self
    }

    /// Fixed `state` value. When unset the coordinator generates one.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn custom_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_params.insert(key.into(), value.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the client ID or redirect URI is empty,
    /// the redirect URI does not parse, or a custom parameter has an empty key or
    /// value or shadows one of the request's own parameters.
    pub fn build(self) -> Result<AuthorizationRequest, Error> {
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig("client ID can't be empty".into()));
        }
        if self.redirect_uri.is_empty() {
            return Err(Error::InvalidConfig("redirect URI can't be empty".into()));
        }
        Url::parse(&self.redirect_uri)
            .map_err(|e| Error::InvalidConfig(format!("redirect URI: {e}")))?;
        if self
            .custom_params
            .iter()
            .any(|(k, v)| k.is_empty() || v.is_empty())
        {
            return Err(Error::InvalidConfig(
                "custom parameter key and value can't be empty".into(),
            ));
        }
        if let Some(key) = self
            .custom_params
            .keys()
            .find(|k| params::RESERVED.contains(&k.as_str()))
        {
            return Err(Error::InvalidConfig(format!(
                "custom parameter {key} is reserved"
            )));
        }

        Ok(AuthorizationRequest {
            client_id: self.client_id,
            response_type: self.response_type,
            redirect_uri: self.redirect_uri,
            scopes: self.scopes,
            show_dialog: self.show_dialog,
            campaign: self.campaign,
            state: self.state,
            code_challenge: None,
            custom_params: self.custom_params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn auth_url() -> Url {
        "https://accounts.spotify.com/authorize".parse().unwrap()
    }

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn build_rejects_empty_client_id() {
        let err = AuthorizationRequest::builder("", ResponseType::Token, "myapp://callback")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn build_rejects_empty_redirect_uri() {
        let err = AuthorizationRequest::builder("abc123", ResponseType::Code, "")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn build_rejects_empty_custom_param() {
        let err = AuthorizationRequest::builder("abc123", ResponseType::Code, "myapp://callback")
            .custom_param("locale", "")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn url_carries_all_parameters() {
        let request = AuthorizationRequest::builder("abc123", ResponseType::Token, "myapp://callback")
            .scopes(["user-read-email", "streaming"])
            .show_dialog(true)
            .campaign("camp1")
            .state("xyz")
            .custom_param("locale", "sv")
            .build()
            .unwrap();
        let url = request.to_url(&auth_url());

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");
        assert_eq!(query(&url, "client_id").as_deref(), Some("abc123"));
        assert_eq!(query(&url, "response_type").as_deref(), Some("token"));
        assert_eq!(query(&url, "redirect_uri").as_deref(), Some("myapp://callback"));
        assert_eq!(query(&url, "show_dialog").as_deref(), Some("true"));
        assert_eq!(query(&url, "utm_source").as_deref(), Some("spotify-sdk"));
        assert_eq!(query(&url, "utm_medium").as_deref(), Some("android-sdk"));
        assert_eq!(query(&url, "utm_campaign").as_deref(), Some("camp1"));
        assert_eq!(query(&url, "scope").as_deref(), Some("streaming user-read-email"));
        assert_eq!(query(&url, "state").as_deref(), Some("xyz"));
        assert_eq!(query(&url, "locale").as_deref(), Some("sv"));
        assert!(query(&url, "code_challenge").is_none());
    }

    #[test]
    fn url_omits_empty_scope_and_defaults_campaign() {
        let request = AuthorizationRequest::builder("abc123", ResponseType::Code, "myapp://callback")
            .campaign("")
            .build()
            .unwrap();
        let url = request.to_url(&auth_url());

        assert!(query(&url, "scope").is_none());
        assert!(query(&url, "state").is_none());
        assert_eq!(query(&url, "utm_campaign").as_deref(), Some(DEFAULT_CAMPAIGN));
        assert_eq!(query(&url, "show_dialog").as_deref(), Some("false"));
    }

    #[test]
    fn code_challenge_is_advertised_as_s256() {
        let request = AuthorizationRequest::builder("abc123", ResponseType::Code, "myapp://callback")
            .build()
            .unwrap()
            .with_code_challenge("challenge".into());
        let url = request.to_url(&auth_url());

        assert_eq!(query(&url, "code_challenge").as_deref(), Some("challenge"));
        assert_eq!(query(&url, "code_challenge_method").as_deref(), Some("S256"));
    }

    #[test]
    fn from_url_restores_request() {
        let request = AuthorizationRequest::builder("abc123", ResponseType::Code, "myapp://callback")
            .scopes(["user-read-email", "user-top-read"])
            .campaign("camp1")
            .state("s1")
            .custom_param("locale", "sv")
            .build()
            .unwrap()
            .with_code_challenge("ch".into());

        let decoded = AuthorizationRequest::from_url(&request.to_url(&auth_url())).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn build_rejects_reserved_custom_param() {
        for key in ["state", "redirect_uri", "utm_campaign", "code_challenge"] {
            let err = AuthorizationRequest::builder("abc123", ResponseType::Code, "myapp://callback")
                .custom_param(key, "override")
                .build()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig, "{key}");
        }
    }

    #[test]
    fn default_campaign_round_trips() {
        let unset = AuthorizationRequest::builder("abc123", ResponseType::Token, "myapp://callback")
            .build()
            .unwrap();
        let explicit = AuthorizationRequest::builder("abc123", ResponseType::Token, "myapp://callback")
            .campaign(DEFAULT_CAMPAIGN)
            .build()
            .unwrap();

        assert_eq!(explicit, unset);
        let decoded = AuthorizationRequest::from_url(&unset.to_url(&auth_url())).unwrap();
        assert_eq!(decoded, unset);
        assert_eq!(decoded.campaign(), DEFAULT_CAMPAIGN);
    }

    #[test]
    fn redirect_uri_is_sent_verbatim() {
        let request = AuthorizationRequest::builder("abc123", ResponseType::Code, "http://127.0.0.1:8888")
            .build()
            .unwrap();
        assert_eq!(request.redirect_uri(), "http://127.0.0.1:8888");

        let url = request.to_url(&auth_url());
        assert_eq!(query(&url, "redirect_uri").as_deref(), Some("http://127.0.0.1:8888"));
        let decoded = AuthorizationRequest::from_url(&url).unwrap();
        assert_eq!(decoded.redirect_uri(), "http://127.0.0.1:8888");
    }

    #[test]
    fn build_rejects_unparseable_redirect_uri() {
        let err = AuthorizationRequest::builder("abc123", ResponseType::Code, "not a uri")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn from_url_requires_client_id() {
        let url: Url = "https://accounts.spotify.com/authorize?response_type=token&redirect_uri=myapp%3A%2F%2Fcb"
            .parse()
            .unwrap();
        let err = AuthorizationRequest::from_url(&url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn from_config_copies_defaults() {
        let config = OAuthConfig::new("abc123", "myapp://callback")
            .with_scopes(vec!["user-read-email".into()])
            .with_campaign("camp1")
            .with_show_dialog(true);
        let request = AuthorizationRequest::from_config(&config, ResponseType::Token)
            .build()
            .unwrap();

        assert_eq!(request.client_id(), "abc123");
        assert!(request.scopes().contains("user-read-email"));
        assert_eq!(request.campaign(), "camp1");
        assert!(request.show_dialog());
    }
}
