use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, SET_COOKIE};

/// Authorization cookies captured from one upstream login response.
///
/// Values are secrets. `Debug` prints cookie names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthCookieJar {
    cookies: BTreeMap<String, String>,
}

impl AuthCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `Set-Cookie` header into a jar, keeping name and value
    /// and dropping attributes. Later headers win on duplicate names.
    pub fn from_set_cookie_headers(headers: &HeaderMap) -> Self {
        let mut jar = Self::new();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.insert(name, value.trim());
                }
            }
        }
        jar
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    /// Render the jar as a `Cookie` request header
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        let mut value = HeaderValue::from_str(&joined)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AuthCookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCookieJar")
            .field("names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthCookieJar {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut jar = Self::new();
        for (name, value) in iter {
            jar.insert(name, value);
        }
        jar
    }
}
