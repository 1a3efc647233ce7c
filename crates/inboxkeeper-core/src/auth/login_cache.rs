use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use tracing::warn;

use super::AuthCookieJar;

/// Argon2 memory cost in KiB. Kept low: this guards an in-memory map,
/// not a password database.
const KEY_MEMORY_KIB: u32 = 4096;

const KEY_LEN: usize = 32;

/// Identifies one set of credentials without holding the password
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    username: String,
    password_digest: [u8; KEY_LEN],
}

struct CachedLogin {
    jar: AuthCookieJar,
    stored_at: Instant,
}

/// Successful logins keyed by normalized username and a salted password
/// digest, so the plaintext password is never retained.
pub(crate) struct LoginCache {
    ttl: Duration,
    salt: [u8; 16],
    entries: Mutex<HashMap<CacheKey, CachedLogin>>,
}

fn derive_key(salt: &[u8; 16], username: String, password: &str) -> Option<CacheKey> {
    let params = Params::new(KEY_MEMORY_KIB, 1, 1, Some(KEY_LEN)).ok()?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut digest = [0u8; KEY_LEN];
    if let Err(e) = argon.hash_password_into(password.as_bytes(), salt, &mut digest) {
        warn!(error = %e, "Could not derive login cache key, bypassing cache");
        return None;
    }
    Some(CacheKey {
        username,
        password_digest: digest,
    })
}

impl LoginCache {
    pub fn new(ttl: Duration) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            ttl,
            salt,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derive the cache key on the blocking pool; Argon2 is too slow to run
    /// on an async worker. `username` must already be normalized.
    pub async fn key(&self, username: &str, password: &str) -> Option<CacheKey> {
        let salt = self.salt;
        let username = username.to_string();
        let password = password.to_string();
        match tokio::task::spawn_blocking(move || derive_key(&salt, username, &password)).await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Login cache key task failed, bypassing cache");
                None
            }
        }
    }

    /// Cached jar for this key, if one is still fresh
    pub fn get(&self, key: &CacheKey) -> Option<AuthCookieJar> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(hit) if hit.stored_at.elapsed() < self.ttl => Some(hit.jar.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, jar: AuthCookieJar) {
        let ttl = self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, cached| cached.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            CachedLogin {
                jar,
                stored_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
