//! Credential login against the upstream site.

use anyhow::{Context, Result};
use reqwest::{header, redirect, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::login_cache::LoginCache;
use super::AuthCookieJar;
use crate::config::UpstreamConfig;

/// Login route. The query makes the upstream answer with 204 + cookies
/// instead of rendering the login page.
const LOGIN_PATH: &str = "/auth/login?nextUrl=%2F&_data=routes%2Fauth%2Flogin";

/// Result of a login attempt that reached the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AuthCookieJar),
    /// Anything other than 204, including rate limiting
    InvalidCredentials { status: StatusCode },
    /// 204 without a single cookie
    EmptyCookieJar,
}

/// The login request never got an answer. Rejections are an `AuthOutcome`.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error during login: {0}")]
    Network(#[from] reqwest::Error),
}

/// Logs in with a username and password and captures the session cookies.
///
/// Successful logins are cached per normalized username and password, so a
/// caller retrying the same login does not hit the upstream again.
pub struct CredentialAuthenticator {
    client: Client,
    login_url: Url,
    cache: LoginCache,
}

impl CredentialAuthenticator {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base = config.base()?;
        let login_url = Url::parse(&format!(
            "{}{}",
            base.as_str().trim_end_matches('/'),
            LOGIN_PATH
        ))
        .context("Failed to build login URL")?;

        // A redirect is never a successful login
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to build login HTTP client")?;

        Ok(Self {
            client,
            login_url,
            cache: LoginCache::new(config.login_cache_ttl()),
        })
    }

    /// Log in, returning the upstream's verdict.
    ///
    /// The username is lower-cased before it is sent; the password is sent
    /// exactly as given.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let username = username.to_lowercase();

        let key = self.cache.key(&username, password).await;
        if let Some(jar) = key.as_ref().and_then(|k| self.cache.get(k)) {
            debug!(username = %username, "Login served from cache");
            return Ok(AuthOutcome::Authenticated(jar));
        }

        let response = self
            .client
            .post(self.login_url.clone())
            .header(header::ACCEPT, "*/*")
            .form(&[("username", username.as_str()), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            warn!(username = %username, %status, "Login rejected by upstream");
            return Ok(AuthOutcome::InvalidCredentials { status });
        }

        let jar = AuthCookieJar::from_set_cookie_headers(response.headers());
        if jar.is_empty() {
            warn!(username = %username, "Login returned no cookies");
            return Ok(AuthOutcome::EmptyCookieJar);
        }

        info!(username = %username, cookies = jar.len(), "Login successful");
        if let Some(key) = key {
            self.cache.insert(key, jar.clone());
        }
        Ok(AuthOutcome::Authenticated(jar))
    }
}
