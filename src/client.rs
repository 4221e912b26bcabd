use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::error::Error;
use crate::types::{AccessToken, AuthorizationCode, Credential};

/// Token response from the accounts-service token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::bearer(self.access_token.clone())
    }

    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        let token = AccessToken::new(self.access_token.clone());
        match self.expires_in {
            Some(seconds) => token.with_expires_in(seconds),
            None => token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Redeems authorization codes at the accounts-service token endpoint.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange an authorization code for tokens using its PKCE verifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the code carries no verifier,
    /// [`Error::Transport`] on network failure, or [`Error::OAuth`] if the
    /// token endpoint rejects the exchange.
    pub async fn exchange_code(&self, code: &AuthorizationCode) -> Result<TokenResponse, Error> {
        let code_verifier = code
            .code_verifier
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidConfig("code verifier is required".into()))?;
        if code.value.is_empty() {
            return Err(Error::InvalidConfig("authorization code can't be empty".into()));
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code.value.as_str()),
            ("redirect_uri", self.config.redirect_uri()),
            ("code_verifier", code_verifier),
        ];

        tracing::debug!(token_url = %self.config.token_url, "Exchanging authorization code");
        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        let token = response.json::<TokenResponse>().await?;
        tracing::info!(expires_in = ?token.expires_in, "Authorization code exchanged");
        Ok(token)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<TokenErrorBody>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {desc}", err.error),
                None => err.error,
            },
            Err(_) => body,
        };
        tracing::warn!(operation, status, detail = %detail, "Accounts service rejected request");
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail,
        })
    }
}
