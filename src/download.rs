//! Authenticated binary downloads
//!
//! A fetched body is registered as a short-lived object URL, handed to a
//! [`SaveSink`] exactly once, and revoked when the [`ObjectUrl`] guard
//! drops. The guard drops on every exit path, including a failing or
//! panicking sink.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::ClientError;

/// In-process table of live object URLs
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: Mutex<HashMap<Uuid, Arc<[u8]>>>,
    revoked: AtomicUsize,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return the guard that revokes it
    pub fn create_object_url(&self, bytes: Vec<u8>) -> ObjectUrl<'_> {
        let id = Uuid::new_v4();
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(id, Arc::from(bytes));
        }
        ObjectUrl { id, registry: self }
    }

    /// Resolve an object URL to its payload while it is live
    pub fn resolve(&self, href: &str) -> Option<Arc<[u8]>> {
        let id = href.strip_prefix(ObjectUrl::SCHEME)?.parse::<Uuid>().ok()?;
        self.blobs.lock().ok()?.get(&id).cloned()
    }

    fn revoke(&self, id: Uuid) {
        let removed = self
            .blobs
            .lock()
            .map(|mut blobs| blobs.remove(&id).is_some())
            .unwrap_or(false);
        if removed {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of object URLs not yet revoked
    pub fn live_count(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Number of object URLs revoked so far
    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }
}

/// Live reference to a registered payload; revoked on drop
#[derive(Debug)]
pub struct ObjectUrl<'a> {
    id: Uuid,
    registry: &'a BlobRegistry,
}

impl ObjectUrl<'_> {
    pub const SCHEME: &'static str = "blob:courtops/";

    pub fn href(&self) -> String {
        format!("{}{}", Self::SCHEME, self.id)
    }

    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.registry.resolve(&self.href())
    }
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

/// The save action triggered for a downloaded payload
pub trait SaveSink: Send + Sync {
    /// Persist the payload behind `url` under `filename`, returning where it landed
    fn save(&self, url: &ObjectUrl<'_>, filename: &str) -> io::Result<PathBuf>;
}

/// Saves into a fixed directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DirectorySink {
    fn save(&self, url: &ObjectUrl<'_>, filename: &str) -> io::Result<PathBuf> {
        let name = safe_file_name(filename).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid download filename '{}'", filename),
            )
        })?;
        let bytes = url.bytes().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "object URL was already revoked")
        })?;

        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(name);
        fs::write(&target, &bytes)?;
        Ok(target)
    }
}

/// Final path component of `filename`, if it has one
fn safe_file_name(filename: &str) -> Option<&str> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

/// Client for authenticated binary fetches
#[derive(Clone)]
pub struct DownloadClient {
    api: ApiClient,
    registry: Arc<BlobRegistry>,
    sink: Arc<dyn SaveSink>,
}

impl DownloadClient {
    pub fn new(api: ApiClient, sink: Arc<dyn SaveSink>) -> Self {
        Self {
            api,
            registry: Arc::new(BlobRegistry::new()),
            sink,
        }
    }

    /// Client saving into `dir`
    pub fn to_directory(api: ApiClient, dir: impl Into<PathBuf>) -> Self {
        Self::new(api, Arc::new(DirectorySink::new(dir)))
    }

    pub fn registry(&self) -> &BlobRegistry {
        &self.registry
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// GET `path` and save the body as `filename`
    pub async fn download(&self, path: &str, filename: &str) -> Result<PathBuf, ClientError> {
        let mut request = self.api.http().get(self.api.url(path));
        if let Some(auth) = self.api.bearer_header() {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(ClientError::download_io)?;
        let status = response.status();
        debug!("GET {} (download) -> {}", path, status.as_u16());
        if !status.is_success() {
            return Err(ClientError::download_status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(ClientError::download_io)?;
        let size = bytes.len();

        let url = self.registry.create_object_url(bytes.to_vec());
        let saved = self.sink.save(&url, filename);
        drop(url);

        let saved = saved.map_err(ClientError::download_io)?;
        info!("Saved {} ({} bytes) to {}", filename, size, saved.display());
        Ok(saved)
    }
}
