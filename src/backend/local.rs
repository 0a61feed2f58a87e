//! Directory-tree backend
//!
//! Layout under the root:
//!
//! ```text
//! <root>/
//! └── network/
//!     ├── 8056c2e21c000001.json          # network document
//!     └── 8056c2e21c000001/
//!         └── member/
//!             └── 00000000a1.json        # member document
//! ```

use super::{Backend, BackendMode, StoredDocument};
use crate::error::StoreError;
use crate::keys::{self, DOCUMENT_SUFFIX};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Backend storing one JSON file per document
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// The root is restricted to its owner since network documents may carry
    /// credentials.
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        lock_down(&root).await?;

        info!(path = %root.display(), "Initialized local store");

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_file(&self, key: &str, body: &[u8]) -> Result<bool, StoreError> {
        let Some(path) = keys::local_path(&self.root, key, true).await? else {
            return Ok(false);
        };

        // Stage beside the target and rename so readers never see half a file.
        // Each write gets its own staging name; concurrent writers to one key
        // must not share it.
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, body).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            fs::remove_file(&tmp).await.ok();
            return Err(e.into());
        }

        debug!(key = %key, size = body.len(), "Wrote document");
        Ok(true)
    }
}

#[cfg(unix)]
async fn lock_down(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await
}

#[cfg(not(unix))]
async fn lock_down(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl Backend for LocalBackend {
    async fn write(&self, key: &str, body: &[u8]) -> bool {
        match self.write_file(key, body).await {
            Ok(written) => written,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write document");
                false
            }
        }
    }

    async fn remove(&self, key: &str) {
        let path = match keys::local_path(&self.root, key, false).await {
            Ok(Some(path)) => path,
            _ => return,
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!(key = %key, "Removed document"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to remove document"),
        }
    }

    /// Walk the whole tree. Names ending in `.json` are documents, anything
    /// else is treated as a directory. Unreadable entries are skipped.
    async fn read_all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let mut documents = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();

                if name.len() > DOCUMENT_SUFFIX.len() && name.ends_with(DOCUMENT_SUFFIX) {
                    match fs::read(&path).await {
                        Ok(body) => {
                            let key = path
                                .strip_prefix(&self.root)
                                .unwrap_or(&path)
                                .to_string_lossy()
                                .into_owned();
                            documents.push(StoredDocument { key, body });
                        }
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "Skipping unreadable document");
                        }
                    }
                } else {
                    pending.push(path);
                }
            }
        }

        Ok(documents)
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Authoritative
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read_all() {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp_dir.path().join("db")).await.unwrap();

        assert!(backend.write("network/0000000000000001", b"{\"id\":1}").await);
        assert!(
            backend
                .write("network/0000000000000001/member/00000000a1", b"{}")
                .await
        );

        let mut docs = backend.read_all().await.unwrap();
        docs.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(docs.len(), 2);
        assert!(docs[0].key.ends_with("0000000000000001.json"));
        assert_eq!(docs[0].body, b"{\"id\":1}");
        assert!(docs[1].key.ends_with("00000000a1.json"));
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("db");
        let backend = LocalBackend::new(&root).await.unwrap();

        assert!(backend.write("network/0000000000000001", b"one").await);
        assert!(backend.write("network/0000000000000001", b"two").await);

        let body = std::fs::read(root.join("network/0000000000000001.json")).unwrap();
        assert_eq!(body, b"two");
        let names: Vec<_> = std::fs::read_dir(root.join("network"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0000000000000001.json".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("db");
        let backend = std::sync::Arc::new(LocalBackend::new(&root).await.unwrap());
        let key = "network/0000000000000001/member/00000000a1";

        for round in 0..20 {
            let mut handles = Vec::new();
            for writer in 0..8usize {
                let backend = backend.clone();
                // Bodies of different lengths so interleaving would show
                let body = serde_json::json!({ "round": round, "pad": "x".repeat(writer * 512) })
                    .to_string();
                handles.push(tokio::spawn(async move {
                    backend.write(key, body.as_bytes()).await
                }));
            }
            for handle in handles {
                assert!(handle.await.unwrap());
            }

            let path = root.join("network/0000000000000001/member/00000000a1.json");
            let body: serde_json::Value =
                serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
            assert_eq!(body["round"], round);
        }

        let names: Vec<_> = std::fs::read_dir(root.join("network/0000000000000001/member"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["00000000a1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp_dir.path()).await.unwrap();

        backend.remove("network/00000000000000ff").await;
        backend.remove("").await;

        assert!(backend.write("network/00000000000000ff", b"{}").await);
        backend.remove("network/00000000000000ff").await;
        assert!(backend.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_write_fails() {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp_dir.path()).await.unwrap();
        assert!(!backend.write("", b"{}").await);
    }

    #[tokio::test]
    async fn test_stray_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("db");
        let backend = LocalBackend::new(&root).await.unwrap();

        std::fs::write(root.join("README"), b"not a document").unwrap();
        std::fs::write(root.join(".json"), b"{}").unwrap();
        assert!(backend.write("network/0000000000000001", b"{}").await);

        let docs = backend.read_all().await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_root_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("db");
        LocalBackend::new(&root).await.unwrap();

        let mode = std::fs::metadata(&root).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
