#![doc = include_str!("../README.md")]

#[cfg(feature = "http")]
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pkce;
pub mod request;
pub mod requester;
pub mod response;
mod sync;
pub mod transport;
pub mod types;

// Re-exports for convenient access
#[cfg(feature = "http")]
pub use client::{AuthClient, TokenResponse};
pub use config::OAuthConfig;
pub use coordinator::{
    AuthorizationCoordinator, AuthorizationResult, AuthorizationSurface, SessionState,
};
pub use error::{Error, ErrorKind};
pub use pkce::{Pkce, generate_code_challenge, generate_code_verifier, generate_state};
pub use request::{AuthorizationRequest, AuthorizationRequestBuilder, DEFAULT_CAMPAIGN};
pub use requester::{Completion, Completions, ProfileResponse, SingleFlightRequester};
pub use response::CallbackPayload;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{RawResponse, Transport};
pub use types::{
    AccessToken, AuthorizationCode, Credential, RequestId, ResponseType, ResultCode,
    SessionHandle,
};
