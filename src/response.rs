use std::collections::BTreeMap;

use url::Url;

use crate::request::params;

/// Fields handed back by the external authorization surface.
///
/// The accounts service returns codes and errors in the redirect query and
/// implicit-grant tokens in the redirect fragment. Both end up here as plain
/// string fields; interpretation is left to the coordinator, which knows which
/// flow the session was started for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackPayload {
    fields: BTreeMap<String, String>,
}

impl CallbackPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect query and fragment parameters of a redirect URI.
    ///
    /// A query parameter wins when the same key also appears in the fragment.
    #[must_use]
    pub fn from_redirect(uri: &Url) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(fragment) = uri.fragment() {
            for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
                fields.insert(key.into_owned(), value.into_owned());
            }
        }
        for (key, value) in uri.query_pairs() {
            fields.insert(key.into_owned(), value.into_owned());
        }
        Self { fields }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.get(params::ERROR)
    }

    pub(crate) fn error_description(&self) -> Option<&str> {
        self.get(params::ERROR_DESCRIPTION)
    }

    pub(crate) fn state(&self) -> Option<&str> {
        self.get(params::STATE)
    }

    pub(crate) fn code(&self) -> Option<&str> {
        self.get(params::CODE).filter(|c| !c.is_empty())
    }

    pub(crate) fn access_token(&self) -> Option<&str> {
        self.get(params::ACCESS_TOKEN).filter(|t| !t.is_empty())
    }

    /// `expires_in` in seconds. Unparseable values are ignored.
    pub(crate) fn expires_in(&self) -> Option<u64> {
        self.get(params::EXPIRES_IN).and_then(|v| v.parse().ok())
    }
}

impl<K, V> FromIterator<(K, V)> for CallbackPayload
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_read_from_query() {
        let uri: Url = "myapp://callback?code=abc&state=s1".parse().unwrap();
        let payload = CallbackPayload::from_redirect(&uri);

        assert_eq!(payload.code(), Some("abc"));
        assert_eq!(payload.state(), Some("s1"));
        assert!(payload.access_token().is_none());
    }

    #[test]
    fn token_is_read_from_fragment() {
        let uri: Url = "myapp://callback#access_token=tok%2B1&token_type=Bearer&expires_in=3600&state=s1"
            .parse()
            .unwrap();
        let payload = CallbackPayload::from_redirect(&uri);

        assert_eq!(payload.access_token(), Some("tok+1"));
        assert_eq!(payload.expires_in(), Some(3600));
        assert_eq!(payload.state(), Some("s1"));
    }

    #[test]
    fn error_is_read_from_query() {
        let uri: Url = "myapp://callback?error=access_denied&state=s1".parse().unwrap();
        let payload = CallbackPayload::from_redirect(&uri);

        assert_eq!(payload.error(), Some("access_denied"));
        assert!(payload.error_description().is_none());
    }

    #[test]
    fn bad_expires_in_is_ignored() {
        let payload = CallbackPayload::new()
            .with_field("access_token", "t")
            .with_field("expires_in", "soon");
        assert_eq!(payload.expires_in(), None);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let payload: CallbackPayload = [("code", ""), ("access_token", "")].into_iter().collect();
        assert!(payload.code().is_none());
        assert!(payload.access_token().is_none());
        assert!(!payload.is_empty());
    }

    #[test]
    fn bare_redirect_is_empty() {
        let uri: Url = "myapp://callback".parse().unwrap();
        assert!(CallbackPayload::from_redirect(&uri).is_empty());
    }
}
