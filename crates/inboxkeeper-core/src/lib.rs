//! inboxkeeper core library.
//!
//! Logs in to the upstream messaging site with a username and password,
//! keeps the resulting cookies in an in-memory session, and pages through
//! the caller's inbox and message threads.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod portal;

pub use api::{ApiError, FetchResult, InboxClient, MessageThreadClient, PaginatedFetcher, PeerThreads};
pub use auth::{AuthCookieJar, AuthOutcome, CredentialAuthenticator, SessionId, SessionStore};
pub use config::{Config, UpstreamConfig};
pub use portal::{InboxPortal, LoginGrant, LogoutGrant, PortalError};
