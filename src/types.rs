use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Correlates an authorization attempt with its eventual callback.
///
/// Minted by [`AuthorizationCoordinator::begin_authorization`](crate::AuthorizationCoordinator::begin_authorization).
/// The flow type (token vs code) is looked up by this handle, never guessed from the payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct SessionHandle(pub Ulid);

impl SessionHandle {
    #[must_use]
    pub(crate) fn generate() -> Self {
        Self(Ulid::new())
    }
}

/// Identity of one call issued through a [`SingleFlightRequester`](crate::SingleFlightRequester).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct RequestId(pub u64);

/// What the authorization service should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Implicit grant: an access token in the redirect fragment.
    Token,
    /// Authorization code grant: a code in the redirect query.
    Code,
}

impl ResponseType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Code => "code",
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token" => Ok(Self::Token),
            "code" => Ok(Self::Code),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown response type: {other}"
            ))),
        }
    }
}

/// Integer result code reported by the external authorization surface.
///
/// Values follow the Android activity convention the accounts SDK uses:
/// `-1` for a completed flow, `0` for a flow the user backed out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const OK: Self = Self(-1);
    pub const CANCELED: Self = Self(0);

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

/// Implicit-grant access token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AccessToken {
    pub value: String,
    /// Lifetime in seconds, when the service reported one.
    pub expires_in: Option<u64>,
}

impl AccessToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_in: None,
        }
    }

    #[must_use]
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }
}

/// Authorization code, plus the PKCE verifier needed to redeem it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuthorizationCode {
    pub value: String,
    pub code_verifier: Option<String>,
}

impl AuthorizationCode {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            code_verifier: None,
        }
    }
}

/// Bearer value attached to authenticated requests.
///
/// Debug output is redacted so credentials never end up in logs.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<AccessToken> for Credential {
    fn from(token: AccessToken) -> Self {
        Self(token.value)
    }
}

impl From<&AccessToken> for Credential {
    fn from(token: &AccessToken) -> Self {
        Self(token.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_type_parses_wire_names() {
        assert_eq!("token".parse::<ResponseType>().unwrap(), ResponseType::Token);
        assert_eq!("code".parse::<ResponseType>().unwrap(), ResponseType::Code);
        assert!("id_token".parse::<ResponseType>().is_err());
    }

    #[test]
    fn response_type_serde_lowercase() {
        let json = serde_json::to_string(&ResponseType::Code).unwrap();
        assert_eq!(json, "\"code\"");
    }

    #[test]
    fn session_handles_are_unique() {
        assert_ne!(SessionHandle::generate(), SessionHandle::generate());
    }

    #[test]
    fn session_handle_display_roundtrip() {
        let handle = SessionHandle::generate();
        let parsed: SessionHandle = handle.to_string().parse().unwrap();
        assert_eq!(parsed, handle);
    }

    #[test]
    fn result_code_constants() {
        assert!(ResultCode::OK.is_ok());
        assert!(!ResultCode::CANCELED.is_ok());
        assert!(!ResultCode::from(42).is_ok());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::from(AccessToken::new("secret-token"));
        assert_eq!(cred.expose(), "secret-token");
        assert!(!format!("{cred:?}").contains("secret"));
    }
}
