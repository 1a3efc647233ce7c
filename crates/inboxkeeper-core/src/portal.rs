//! Caller-facing operations: login, inbox, messages, logout.
//!
//! `InboxPortal` ties the authenticator, session store and clients
//! together. Transport framing (routes, cookies, redirects) belongs to
//! whatever serves these operations; the portal only says which redirect
//! and which status each outcome maps to.

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{
    parse_peer_list, ApiError, InboxClient, InboxResult, MessageThreadClient, PaginatedFetcher,
    PeerThreads,
};
use crate::auth::{
    AuthError, AuthOutcome, CredentialAuthenticator, SessionId, SessionRecord, SessionStore,
};
use crate::config::UpstreamConfig;

/// Name of the cookie that carries the session token
pub const SESSION_COOKIE: &str = "authorization";

/// Where a caller goes after logging in
pub const LOGIN_REDIRECT: &str = "/list";

/// Where a caller goes after logging out
pub const LOGOUT_REDIRECT: &str = "/";

pub const LOGIN_FAILED_MESSAGE: &str =
    "Incorrect credentials. If you're confident they are correct, please join the discord.";

pub const NOT_AUTHORIZED_MESSAGE: &str = "Not authorized, please login first.";

pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str =
    "The messaging service is unavailable right now, please try again later.";

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] ApiError),
}

impl PortalError {
    /// HTTP status to answer the caller with
    pub fn status_code(&self) -> u16 {
        match self {
            PortalError::AuthenticationFailed | PortalError::NotAuthorized => 403,
            PortalError::UpstreamUnavailable(_) => 502,
        }
    }

    /// Fixed message safe to show the caller. Never includes upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            PortalError::AuthenticationFailed => LOGIN_FAILED_MESSAGE,
            PortalError::NotAuthorized => NOT_AUTHORIZED_MESSAGE,
            PortalError::UpstreamUnavailable(_) => UPSTREAM_UNAVAILABLE_MESSAGE,
        }
    }
}

/// Successful login: hand `token` to the caller and send them to `redirect`
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SessionId,
    pub username: String,
    pub redirect: &'static str,
}

/// Logout: clear the caller's token cookie and send them to `redirect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutGrant {
    pub clear_cookie: &'static str,
    pub redirect: &'static str,
    /// Whether a server-side session was actually removed
    pub invalidated: bool,
}

pub struct InboxPortal {
    authenticator: CredentialAuthenticator,
    sessions: Arc<SessionStore>,
    inbox: InboxClient,
    threads: MessageThreadClient,
}

impl InboxPortal {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::with_session_store(config, Arc::new(SessionStore::from_config(config)))
    }

    /// Build a portal around an existing session store
    pub fn with_session_store(config: &UpstreamConfig, sessions: Arc<SessionStore>) -> Result<Self> {
        config.validate()?;
        let fetcher = PaginatedFetcher::new(config)?;
        Ok(Self {
            authenticator: CredentialAuthenticator::new(config)?,
            sessions,
            inbox: InboxClient::new(fetcher.clone(), config)?,
            threads: MessageThreadClient::new(fetcher, config)?,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Log in upstream and open a session
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, PortalError> {
        let username = username.to_lowercase();
        let outcome = self
            .authenticator
            .authenticate(&username, password)
            .await
            .map_err(|AuthError::Network(e)| PortalError::UpstreamUnavailable(ApiError::Network(e)))?;

        let cookies = match outcome {
            AuthOutcome::Authenticated(cookies) => cookies,
            AuthOutcome::InvalidCredentials { status } => {
                debug!(username = %username, %status, "Login refused");
                return Err(PortalError::AuthenticationFailed);
            }
            AuthOutcome::EmptyCookieJar => return Err(PortalError::AuthenticationFailed),
        };

        let token = self.sessions.create(cookies, &username);
        Ok(LoginGrant {
            token,
            username,
            redirect: LOGIN_REDIRECT,
        })
    }

    fn session(&self, token: Option<&str>) -> Result<Arc<SessionRecord>, PortalError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(PortalError::NotAuthorized)?;
        self.sessions
            .get(&SessionId::from(token))
            .ok_or(PortalError::NotAuthorized)
    }

    /// All inbox threads of the logged-in caller
    pub async fn inbox(&self, token: Option<&str>) -> Result<InboxResult, PortalError> {
        let session = self.session(token)?;
        self.inbox
            .fetch_inbox(&session.username, &session.cookies)
            .await
            .map_err(|e| {
                warn!(username = %session.username, error = %e, "Inbox fetch failed");
                PortalError::from(e)
            })
    }

    /// Threads with every peer in a comma-separated list, fetched in order
    pub async fn messages(&self, token: Option<&str>, peers_csv: &str) -> Result<PeerThreads, PortalError> {
        let session = self.session(token)?;
        let peers = parse_peer_list(peers_csv);
        self.threads
            .fetch_threads(&session.username, &peers, &session.cookies)
            .await
            .map_err(|e| {
                warn!(username = %session.username, error = %e, "Message fetch failed");
                PortalError::from(e)
            })
    }

    /// End the caller's session, server side included
    pub fn logout(&self, token: Option<&str>) -> LogoutGrant {
        let invalidated = token
            .filter(|t| !t.is_empty())
            .is_some_and(|t| self.sessions.invalidate(&SessionId::from(t)));
        info!(invalidated, "Logout");
        LogoutGrant {
            clear_cookie: SESSION_COOKIE,
            redirect: LOGOUT_REDIRECT,
            invalidated,
        }
    }
}
