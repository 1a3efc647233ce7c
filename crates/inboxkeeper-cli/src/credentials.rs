//! Upstream passwords saved with `--remember`, so later exports can log in
//! without prompting.

use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service the entries are filed under
const SERVICE_NAME: &str = "inboxkeeper";

/// One keychain entry per lower-cased upstream username
pub struct CredentialStore;

impl CredentialStore {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, username)
            .with_context(|| format!("Failed to open keychain entry for {}", username))
    }

    /// Remember the password that just logged `username` in
    pub fn store(username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .context("Failed to save password to keychain")
    }

    /// Saved password, or `None` when there is none or the keychain is unavailable
    pub fn get_password(username: &str) -> Option<String> {
        Self::entry(username).ok()?.get_password().ok()
    }

    /// Used by `inboxkeeper forget`
    pub fn delete(username: &str) -> Result<()> {
        Self::entry(username)?
            .delete_credential()
            .context("No saved password to remove")
    }
}
