//! Bearer-token storage for chat-link clients.
//!
//! The platform issues one opaque bearer token per session. This module holds
//! that single value behind a trait so applications can pick the storage that
//! fits their deployment: in-memory for tests and short-lived processes,
//! file-backed for installations where the session must survive a restart.
//!
//! The store is a last-write-wins cell. No expiry tracking happens here —
//! staleness is discovered by a rejected request or a failed handshake.

use crate::error::{ChatLinkError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Fixed file name for the persisted token value.
const TOKEN_FILE_NAME: &str = "auth_token";

/// Storage backend for the single bearer token.
///
/// Implementations must be safe to share across the API client and the
/// realtime connection task; the realtime task re-reads the store before
/// every connect and reconnect, so a token replaced after login takes effect
/// without recreating the connection.
pub trait TokenStore: Send + Sync {
    /// Current token, or `None` when unauthenticated.
    fn get(&self) -> Result<Option<String>>;

    /// Replace the stored token.
    fn set(&self, token: &str) -> Result<()>;

    /// Remove the stored token (logout).
    fn clear(&self) -> Result<()>;
}

/// Reference-counted shared token store handle.
pub type SharedTokenStore = Arc<dyn TokenStore>;

/// In-memory token store.
///
/// Does not persist across restarts. Useful for unit tests and processes
/// that log in on every start.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    cell: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            cell: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>> {
        let guard = self
            .cell
            .read()
            .map_err(|e| ChatLinkError::StorageError(e.to_string()))?;
        Ok(guard.clone())
    }

    fn set(&self, token: &str) -> Result<()> {
        let mut guard = self
            .cell
            .write()
            .map_err(|e| ChatLinkError::StorageError(e.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .cell
            .write()
            .map_err(|e| ChatLinkError::StorageError(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// File-backed token store.
///
/// Persists the token as a single string in `<dir>/auth_token` so the session
/// survives a process restart within the same installation. File permissions
/// are restricted to the owner (0600) on Unix. A missing file means
/// unauthenticated.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Default storage directory: the platform config dir under `chat-link`,
    /// falling back to `~/.chat-link` when no config dir is available.
    pub fn default_dir() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("chat-link")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".chat-link")
        } else {
            PathBuf::from(".chat-link")
        }
    }

    /// Create a store at the default location.
    pub fn new() -> Result<Self> {
        Self::in_dir(Self::default_dir())
    }

    /// Create a store in a custom directory. The directory is created on the
    /// first `set`, not here.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path: dir.as_ref().join(TOKEN_FILE_NAME),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            ChatLinkError::StorageError(format!(
                "Failed to set permissions on {}: {}",
                path.display(),
                e
            ))
        })
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ChatLinkError::StorageError(format!(
                "Failed to read token file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChatLinkError::StorageError(format!(
                    "Failed to create token directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        fs::write(&self.path, token).map_err(|e| {
            ChatLinkError::StorageError(format!(
                "Failed to write token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Self::restrict_permissions(&self.path)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatLinkError::StorageError(format!(
                "Failed to remove token file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.set("tok_abc").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok_abc".to_string()));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn memory_store_last_write_wins() {
        let store = MemoryTokenStore::with_token("old");
        store.set("new").unwrap();
        assert_eq!(store.get().unwrap(), Some("new".to_string()));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();

        assert_eq!(store.get().unwrap(), None);

        store.set("tok_persisted").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok_persisted".to_string()));

        // A second store over the same directory sees the same value.
        let reopened = FileTokenStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get().unwrap(), Some("tok_persisted".to_string()));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn file_store_ignores_surrounding_whitespace() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();
        fs::write(store.path(), "  tok_trimmed\n").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok_trimmed".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path()).unwrap();
        store.set("tok_secret").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
