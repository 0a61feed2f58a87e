//! Persistence backends
//!
//! Two structurally different stores sit behind one contract:
//! - [`LocalBackend`] - a directory tree of JSON files (authoritative mode)
//! - [`RemoteBackend`] - a control service spoken to over HTTP (delegated mode)
//!
//! The variant is picked once from the configured location string.

pub mod local;
pub mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use crate::config::{Location, StoreConfig};
use crate::error::StoreError;
use async_trait::async_trait;

/// Who owns document deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Local store; this process creates and deletes documents
    Authoritative,
    /// Remote control plane; deletions happen on the remote side
    Delegated,
}

/// One raw document returned by a bulk read
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Backend-specific name (relative path or object key)
    pub key: String,
    /// Serialized document body
    pub body: Vec<u8>,
}

/// Uniform access to a document store.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Store `body` under `key`. Returns whether the backend accepted it.
    async fn write(&self, key: &str, body: &[u8]) -> bool;

    /// Best-effort removal; a missing document is not an error.
    async fn remove(&self, key: &str);

    /// Every document in the store, for the startup load.
    ///
    /// An error means the store is not readable yet and nothing was returned.
    async fn read_all(&self) -> Result<Vec<StoredDocument>, StoreError>;

    fn mode(&self) -> BackendMode;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Construct the backend selected by `config.location`
pub async fn open(config: &StoreConfig) -> Result<Box<dyn Backend>, StoreError> {
    match config.parsed_location()? {
        Location::Local(root) => Ok(Box::new(LocalBackend::new(root).await?)),
        Location::Remote {
            host,
            port,
            base_path,
        } => Ok(Box::new(RemoteBackend::new(
            &host,
            port,
            &base_path,
            config.http_timeout(),
        )?)),
    }
}
