//! Bearer token storage, persisted by default in ~/.courtops/session.json
//!
//! The store is a cheap cloneable handle handed to every client at
//! construction. Reads come from an in-memory copy; writes are persisted
//! to the backing [`TokenStorage`] under the same lock that updates memory.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::warn;

/// Key the token is stored under in the session file
pub const TOKEN_STORAGE_KEY: &str = "courtops_token";

/// Persistent backing for the credential store.
///
/// Implementations swallow their own I/O failures: the store cannot fail.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn remove(&self);
}

/// Ensure ~/.courtops/ exists and return it
pub fn courtops_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".courtops");
    fs::create_dir_all(&dir).ok();
    dir
}

/// Default path of the session file
pub fn default_session_path() -> PathBuf {
    courtops_dir().join("session.json")
}

/// Token kept in a JSON object under [`TOKEN_STORAGE_KEY`]
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> HashMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn write_entries(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).ok();
        }
        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode session file: {}", e);
                return;
            }
        };
        if let Err(e) = write_private(&self.path, json.as_bytes()) {
            warn!("Failed to write session file {}: {}", self.path.display(), e);
        }
    }
}

/// Write `contents` to `path`, readable by the owner only on unix
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies on creation; tighten files left by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<String> {
        self.read_entries().remove(TOKEN_STORAGE_KEY)
    }

    fn save(&self, token: &str) {
        let mut entries = self.read_entries();
        entries.insert(TOKEN_STORAGE_KEY.to_string(), token.to_string());
        self.write_entries(&entries);
    }

    fn remove(&self) {
        let mut entries = self.read_entries();
        if entries.remove(TOKEN_STORAGE_KEY).is_some() {
            self.write_entries(&entries);
        }
    }
}

/// Process-local storage, for tests and one-shot sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
    }

    fn remove(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

/// Holder of zero-or-one bearer token
#[derive(Clone)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
    storage: Arc<dyn TokenStorage>,
}

impl CredentialStore {
    /// Create a store, seeding the in-memory token from `storage`
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let token = storage.load();
        Self {
            token: Arc::new(RwLock::new(token)),
            storage,
        }
    }

    /// Store backed by the session file at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileTokenStorage::new(path)))
    }

    /// Store with no persistence beyond this process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::default()))
    }

    /// Store the token, replacing any previous one
    ///
    /// The write lock is held while persisting so memory and storage
    /// always end on the same token.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.save(&token);
        *slot = Some(token);
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn is_present(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    /// Drop the token (logout)
    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.remove();
        *slot = None;
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("present", &self.is_present())
            .finish()
    }
}
