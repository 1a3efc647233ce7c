//! Authentication module for upstream logins and caller sessions.
//!
//! This module provides:
//! - `CredentialAuthenticator`: username/password login that captures the
//!   upstream's authorization cookies
//! - `AuthCookieJar`: the captured cookies, replayed on later requests
//! - `SessionStore`: in-memory registry mapping session tokens to jars
//!
//! Sessions live only in memory and expire after a configurable TTL.

pub mod authenticator;
pub mod cookies;
mod login_cache;
pub mod session;

pub use authenticator::{AuthError, AuthOutcome, CredentialAuthenticator};
pub use cookies::AuthCookieJar;
pub use session::{SessionId, SessionRecord, SessionStore};
