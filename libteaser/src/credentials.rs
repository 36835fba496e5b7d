//! Credential store abstraction
//!
//! Credentials are acquired elsewhere (OAuth flows are the host's business);
//! this module only defines how the core looks them up and checks them.
//!
//! - `CredentialStore` trait: lookup by platform and owner, plus validation
//! - `MemoryCredentialStore`: in-process store the host fills directly
//! - `FileCredentialStore`: read-only store loaded from a TOML file
//!
//! # Example
//!
//! ```
//! use libteaser::credentials::{CredentialStore, MemoryCredentialStore};
//! use libteaser::types::Credential;
//!
//! let store = MemoryCredentialStore::new();
//! store.add(Credential::new("12", "facebook", "alice", "Alice's Page", "EAAB..."));
//!
//! let found = store.credentials_for("facebook", "alice");
//! assert_eq!(found.len(), 1);
//! assert!(store.validate(&found[0]));
//! ```

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CredentialError, Result};
use crate::types::{Credential, CredentialKey};

/// Lookup interface the dispatcher consumes.
///
/// Implementations must tolerate concurrent reads; the dispatcher may call
/// them from several publish tasks at once.
pub trait CredentialStore: Send + Sync {
    /// All credentials `owner` holds for `platform`, in store order
    fn credentials_for(&self, platform: &str, owner: &str) -> Vec<Credential>;

    /// Whether `credential` is known to the store and usable for posting
    fn validate(&self, credential: &Credential) -> bool;

    /// Short name used in log messages
    fn backend_name(&self) -> &str;
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<Vec<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_credentials(credentials: Vec<Credential>) -> Self {
        Self {
            credentials: RwLock::new(credentials),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Credential>> {
        self.credentials.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Credential>> {
        self.credentials.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a credential, replacing any stored one with the same key
    pub fn add(&self, credential: Credential) {
        let key = credential.key();
        let mut credentials = self.write();
        match credentials.iter_mut().find(|c| c.key() == key) {
            Some(existing) => *existing = credential,
            None => credentials.push(credential),
        }
    }

    /// Remove a credential; returns whether one was stored
    pub fn remove(&self, key: &CredentialKey) -> bool {
        let mut credentials = self.write();
        let before = credentials.len();
        credentials.retain(|c| &c.key() != key);
        credentials.len() != before
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn credentials_for(&self, platform: &str, owner: &str) -> Vec<Credential> {
        self.read()
            .iter()
            .filter(|c| c.platform == platform && c.owner == owner)
            .cloned()
            .collect()
    }

    fn validate(&self, credential: &Credential) -> bool {
        if !credential.has_token() {
            return false;
        }

        let key = credential.key();
        self.read().iter().any(|stored| {
            stored.key() == key
                && stored.token.expose_secret() == credential.token.expose_secret()
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    credentials: Vec<Credential>,
}

/// Credential store loaded from a TOML file.
///
/// ```toml
/// [[credentials]]
/// id = "12"
/// platform = "facebook"
/// owner = "alice"
/// account_name = "Alice's Page"
/// token = "EAAB..."
/// ```
pub struct FileCredentialStore {
    inner: MemoryCredentialStore,
}

impl FileCredentialStore {
    pub fn load(path: &Path) -> Result<Self> {
        let path_display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path_display.clone(),
            source,
        })?;

        let file: CredentialsFile =
            toml::from_str(&content).map_err(|source| CredentialError::Parse {
                path: path_display.clone(),
                source,
            })?;

        debug!(
            "Loaded {} credential(s) from {}",
            file.credentials.len(),
            path_display
        );

        Ok(Self {
            inner: MemoryCredentialStore::from_credentials(file.credentials),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CredentialStore for FileCredentialStore {
    fn credentials_for(&self, platform: &str, owner: &str) -> Vec<Credential> {
        self.inner.credentials_for(platform, owner)
    }

    fn validate(&self, credential: &Credential) -> bool {
        self.inner.validate(credential)
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TeaserError;
    use tempfile::TempDir;

    #[test]
    fn test_credentials_for_filters_platform_and_owner() {
        let store = MemoryCredentialStore::from_credentials(vec![
            Credential::new("1", "facebook", "alice", "Alice", "a"),
            Credential::new("2", "facebook", "bob", "Bob", "b"),
            Credential::new("3", "twitter", "alice", "@alice", "c"),
            Credential::new("4", "facebook", "alice", "Alice's Page", "d"),
        ]);

        let ids: Vec<String> = store
            .credentials_for("facebook", "alice")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_add_replaces_same_key() {
        let store = MemoryCredentialStore::new();
        store.add(Credential::new("1", "facebook", "alice", "Old", "a"));
        store.add(Credential::new("1", "facebook", "alice", "New", "b"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.credentials_for("facebook", "alice")[0].account_name, "New");
    }

    #[test]
    fn test_validate() {
        let store = MemoryCredentialStore::new();
        let stored = Credential::new("1", "facebook", "alice", "Alice", "token");
        store.add(stored.clone());

        assert!(store.validate(&stored));

        let unknown = Credential::new("2", "facebook", "alice", "Alice", "token");
        assert!(!store.validate(&unknown));

        let stale = Credential::new("1", "facebook", "alice", "Alice", "old-token");
        assert!(!store.validate(&stale));
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let empty = Credential::new("1", "facebook", "alice", "Alice", "");
        let store = MemoryCredentialStore::from_credentials(vec![empty.clone()]);
        assert!(!store.validate(&empty));
    }

    #[test]
    fn test_remove() {
        let store = MemoryCredentialStore::new();
        store.add(Credential::new("1", "tumblr", "alice", "Alice", "t"));

        assert!(store.remove(&CredentialKey::new("tumblr", "1")));
        assert!(!store.remove(&CredentialKey::new("tumblr", "1")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_loads_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(
            &path,
            r#"
            [[credentials]]
            id = "12"
            platform = "facebook"
            owner = "alice"
            account_name = "Alice's Page"
            token = "EAAB"

            [[credentials]]
            id = "7"
            platform = "tumblr"
            owner = "alice"
            token = "tt"
            "#,
        )
        .unwrap();

        let store = FileCredentialStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.backend_name(), "file");

        let tumblr = store.credentials_for("tumblr", "alice");
        assert_eq!(tumblr.len(), 1);
        assert_eq!(tumblr[0].account_name, "");
        assert!(store.validate(&tumblr[0]));
    }

    #[test]
    fn test_file_store_missing_file() {
        let result = FileCredentialStore::load(Path::new("/nonexistent/credentials.toml"));
        assert!(matches!(
            result,
            Err(TeaserError::Credential(CredentialError::Read { .. }))
        ));
    }

    #[test]
    fn test_file_store_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "[[credentials]]\nid = 1\n").unwrap();

        let result = FileCredentialStore::load(&path);
        assert!(matches!(
            result,
            Err(TeaserError::Credential(CredentialError::Parse { .. }))
        ));
    }
}
