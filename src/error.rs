/// Category of a failed authorization or request.
///
/// Every failure the crate reports maps onto exactly one kind, so callers can
/// decide on retries without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Request construction rejected locally.
    InvalidConfig,
    /// Authorization callback could not be interpreted.
    ParseFailure,
    /// The accounts service answered with an explicit error (e.g. `access_denied`).
    Authorization,
    /// Network-layer failure. Callers may retry.
    Transport,
    /// Response body was not the expected JSON.
    Decode,
    /// Superseded or explicitly cancelled. Never delivered by the requester.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Malformed authorization callback: {0}")]
    ParseFailure(String),
    #[error("Authorization error: {0}")]
    Authorization(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("OAuth2 error during {operation} (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::ParseFailure(_) => ErrorKind::ParseFailure,
            Self::Authorization(_) | Self::OAuth { .. } => ErrorKind::Authorization,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_token_endpoint_failures_to_authorization() {
        let err = Error::OAuth {
            operation: "token exchange",
            status: Some(400),
            detail: "invalid_grant".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.to_string().contains("token exchange"));
    }

    #[test]
    fn json_errors_are_decode_failures() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
