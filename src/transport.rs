use std::future::Future;

use crate::error::Error;
use crate::types::Credential;

/// Raw HTTP answer before body decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Issues authenticated GET requests on behalf of a
/// [`SingleFlightRequester`](crate::SingleFlightRequester).
///
/// Dropping the returned future must abort the request; that is how the
/// requester signals cancellation.
pub trait Transport: Send + Sync + 'static {
    fn get(
        &self,
        credential: &Credential,
        endpoint: &str,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use url::Url;

    use super::{RawResponse, Transport};
    use crate::config::OAuthConfig;
    use crate::error::Error;
    use crate::types::Credential;

    /// [`Transport`] backed by `reqwest`.
    ///
    /// Relative endpoints (`me`, `/me`) resolve against the Web API base URL;
    /// absolute URLs are used as given.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        base_url: Url,
        http: reqwest::Client,
    }

    impl HttpTransport {
        #[must_use]
        pub fn new(base_url: Url) -> Self {
            Self {
                base_url,
                http: reqwest::Client::new(),
            }
        }

        #[must_use]
        pub fn from_config(config: &OAuthConfig) -> Self {
            Self::new(config.api_url().clone())
        }

        /// Use a custom HTTP client (for connection pool reuse or testing).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }

        pub(crate) fn resolve(&self, endpoint: &str) -> Result<Url, Error> {
            self.base_url
                .join(endpoint.trim_start_matches('/'))
                .map_err(|e| Error::InvalidConfig(format!("endpoint {endpoint}: {e}")))
        }
    }

    impl Transport for HttpTransport {
        async fn get(&self, credential: &Credential, endpoint: &str) -> Result<RawResponse, Error> {
            let url = self.resolve(endpoint)?;
            tracing::debug!(url = %url, "Sending authenticated request");

            let response = self
                .http
                .get(url)
                .bearer_auth(credential.expose())
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;

            Ok(RawResponse {
                status,
                body: body.to_vec(),
            })
        }
    }

}
