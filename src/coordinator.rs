use std::collections::{HashMap, VecDeque};

use url::Url;

use crate::config::OAuthConfig;
use crate::error::{Error, ErrorKind};
use crate::pkce::{self, Pkce};
use crate::request::AuthorizationRequest;
use crate::response::CallbackPayload;
use crate::types::{
    AccessToken, AuthorizationCode, Credential, ResponseType, ResultCode, SessionHandle,
};

/// External surface that shows the accounts-service login to the user.
///
/// Implementations open a browser, web view or companion app with `url` and
/// arrange for the redirect to be passed back to
/// [`AuthorizationCoordinator::complete_authorization`] together with `session`.
/// `launch` must return as soon as the handoff has been initiated.
pub trait AuthorizationSurface: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the surface could not be opened.
    fn launch(&self, session: SessionHandle, url: &Url) -> Result<(), Error>;
}

impl<F> AuthorizationSurface for F
where
    F: Fn(SessionHandle, &Url) -> Result<(), Error> + Send + Sync,
{
    fn launch(&self, session: SessionHandle, url: &Url) -> Result<(), Error> {
        self(session, url)
    }
}

/// Outcome of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Token(AccessToken),
    Code(AuthorizationCode),
    Error { kind: ErrorKind, message: String },
    Cancelled,
}

impl AuthorizationResult {
    /// Bearer credential, for token-flow results.
    ///
    /// Codes must be redeemed first (see `AuthClient::exchange_code`).
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        match self {
            Self::Token(token) => Some(Credential::from(token)),
            _ => None,
        }
    }
}

impl From<Error> for AuthorizationResult {
    fn from(e: Error) -> Self {
        match e {
            Error::Cancelled => Self::Cancelled,
            other => Self::Error {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

/// Lifecycle of a session.
///
/// `Idle → AwaitingExternalResult → Resolved | Failed | Cancelled`.
/// The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingExternalResult,
    Resolved,
    Failed,
    Cancelled,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug)]
struct Session {
    flow: ResponseType,
    state: String,
    state_required: bool,
    code_verifier: Option<String>,
}

/// Number of finished sessions whose terminal state is still reported by
/// [`AuthorizationCoordinator::state`].
const FINISHED_CAPACITY: usize = 64;

/// Drives authorization attempts from request construction to a typed result.
///
/// Each attempt is tracked under its own [`SessionHandle`], so token and code
/// flows may be in flight at the same time without their callbacks being
/// confused. Only awaiting sessions are kept; once a session reaches a
/// terminal state it is evicted and just its final state is remembered, for
/// the most recent finished sessions.
pub struct AuthorizationCoordinator<S> {
    config: OAuthConfig,
    surface: S,
    sessions: HashMap<SessionHandle, Session>,
    finished: VecDeque<(SessionHandle, SessionState)>,
}

impl<S: AuthorizationSurface> AuthorizationCoordinator<S> {
    #[must_use]
    pub fn new(config: OAuthConfig, surface: S) -> Self {
        Self {
            config,
            surface,
            sessions: HashMap::new(),
            finished: VecDeque::with_capacity(FINISHED_CAPACITY),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build a request with explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `client_id` or `redirect_uri` is empty or invalid.
    pub fn build_request<I, T>(
        &self,
        client_id: &str,
        response_type: ResponseType,
        redirect_uri: &str,
        scopes: I,
        campaign: Option<&str>,
    ) -> Result<AuthorizationRequest, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut builder = AuthorizationRequest::builder(client_id, response_type, redirect_uri)
            .scopes(scopes)
            .show_dialog(self.config.show_dialog());
        if let Some(campaign) = campaign {
            builder = builder.campaign(campaign);
        }
        builder.build()
    }

    /// Build a request from the configured client, redirect URI, scopes and campaign.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration has an empty client ID.
    pub fn request_for(&self, response_type: ResponseType) -> Result<AuthorizationRequest, Error> {
        AuthorizationRequest::from_config(&self.config, response_type).build()
    }

    /// Hand `request` to the authorization surface and start tracking the session.
    ///
    /// A `state` value is generated when the request has none. A callback
    /// must echo a state the caller set on the request; a generated one is
    /// only checked when the callback carries a state at all. Code-flow
    /// requests additionally get a PKCE challenge; the verifier stays with
    /// the session and comes back in [`AuthorizationResult::Code`].
    ///
    /// # Errors
    ///
    /// Propagates the surface's error if the handoff fails. The session is then
    /// recorded as [`SessionState::Failed`].
    pub fn begin_authorization(
        &mut self,
        request: AuthorizationRequest,
    ) -> Result<SessionHandle, Error> {
        let flow = request.response_type();
        let (mut request, state, state_required) = match request.state().map(String::from) {
            Some(state) => (request, state, true),
            None => {
                let state = pkce::generate_state();
                (request.with_state(state.clone()), state, false)
            }
        };

        let code_verifier = match flow {
            ResponseType::Code => {
                let pkce = Pkce::generate();
                request = request.with_code_challenge(pkce.challenge);
                Some(pkce.verifier)
            }
            ResponseType::Token => None,
        };

        let handle = SessionHandle::generate();
        let url = request.to_url(&self.config.auth_url);
        if let Err(e) = self.surface.launch(handle, &url) {
            tracing::error!(session = %handle, error = %e, "Authorization surface failed to launch");
            self.finish(handle, SessionState::Failed);
            return Err(e);
        }

        self.sessions.insert(
            handle,
            Session {
                flow,
                state,
                state_required,
                code_verifier,
            },
        );
        tracing::info!(session = %handle, flow = %flow, "Authorization handed off");
        Ok(handle)
    }

    /// Interpret the surface's callback for `session`.
    ///
    /// Each session yields one result. Repeated callbacks, and callbacks for
    /// unknown handles, yield `Error { kind: ParseFailure, .. }` without
    /// touching any session.
    pub fn complete_authorization(
        &mut self,
        session: SessionHandle,
        result_code: ResultCode,
        payload: &CallbackPayload,
    ) -> AuthorizationResult {
        let Some(entry) = self.sessions.remove(&session) else {
            let status = self.state(session);
            if status.is_terminal() {
                tracing::warn!(session = %session, status = ?status, "Callback for finished session");
                return Error::ParseFailure(format!("session {session} already completed")).into();
            }
            tracing::warn!(session = %session, "Callback for unknown session");
            return Error::ParseFailure(format!("unknown session {session}")).into();
        };

        if !result_code.is_ok() {
            self.finish(session, SessionState::Cancelled);
            tracing::info!(session = %session, result_code = %result_code, "Authorization cancelled");
            return AuthorizationResult::Cancelled;
        }

        match interpret(&entry, payload) {
            Ok(result) => {
                self.finish(session, SessionState::Resolved);
                tracing::info!(session = %session, flow = %entry.flow, "Authorization resolved");
                result
            }
            Err(e) => {
                self.finish(session, SessionState::Failed);
                tracing::warn!(session = %session, error = %e, "Authorization failed");
                e.into()
            }
        }
    }

    /// Abandon an awaiting session. Returns `false` if it was not awaiting.
    pub fn cancel_authorization(&mut self, session: SessionHandle) -> bool {
        if self.sessions.remove(&session).is_none() {
            return false;
        }
        self.finish(session, SessionState::Cancelled);
        tracing::debug!(session = %session, "Authorization abandoned");
        true
    }

    /// Current state of `session`.
    ///
    /// Handles that were never issued, were forgotten, or finished long
    /// enough ago to have been dropped from the record are [`SessionState::Idle`].
    #[must_use]
    pub fn state(&self, session: SessionHandle) -> SessionState {
        if self.sessions.contains_key(&session) {
            return SessionState::AwaitingExternalResult;
        }
        self.finished
            .iter()
            .find(|(handle, _)| *handle == session)
            .map_or(SessionState::Idle, |(_, status)| *status)
    }

    /// Drop the recorded terminal state of a finished session.
    pub fn forget(&mut self, session: SessionHandle) {
        self.finished.retain(|(handle, _)| *handle != session);
    }

    fn finish(&mut self, session: SessionHandle, status: SessionState) {
        if self.finished.len() == FINISHED_CAPACITY {
            self.finished.pop_front();
        }
        self.finished.push_back((session, status));
    }
}

fn interpret(session: &Session, payload: &CallbackPayload) -> Result<AuthorizationResult, Error> {
    if payload.is_empty() {
        return Err(Error::ParseFailure("empty callback payload".into()));
    }

    if let Some(error) = payload.error() {
        let message = match payload.error_description() {
            Some(desc) => format!("{error}: {desc}"),
            None => error.to_owned(),
        };
        return Err(Error::Authorization(message));
    }

    match payload.state() {
        Some(received) if received != session.state => {
            return Err(Error::ParseFailure("state mismatch".into()));
        }
        None if session.state_required => {
            return Err(Error::ParseFailure("missing state".into()));
        }
        _ => {}
    }

    match session.flow {
        ResponseType::Token => {
            let value = payload
                .access_token()
                .ok_or_else(|| Error::ParseFailure("missing access_token".into()))?;
            let mut token = AccessToken::new(value);
            if let Some(expires_in) = payload.expires_in() {
                token = token.with_expires_in(expires_in);
            }
            Ok(AuthorizationResult::Token(token))
        }
        ResponseType::Code => {
            let value = payload
                .code()
                .ok_or_else(|| Error::ParseFailure("missing code".into()))?;
            let mut code = AuthorizationCode::new(value);
            code.code_verifier = session.code_verifier.clone();
            Ok(AuthorizationResult::Code(code))
        }
    }
}
