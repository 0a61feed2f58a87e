//! Logical document keys and their physical locations
//!
//! A key is a slash-delimited path such as `network/<nwid>/member/<mid>`.
//! Locally every segment but the last is a directory and the last names a
//! `.json` file. Remotely the key is appended to the base path with `/`.

use crate::ids::{MemberId, NetworkId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Suffix of every stored document
pub const DOCUMENT_SUFFIX: &str = ".json";

/// Key of a network document
pub fn network_key(network_id: NetworkId) -> String {
    format!("network/{}", network_id)
}

/// Key of a member document, nested under its network
pub fn member_key(network_id: NetworkId, member_id: MemberId) -> String {
    format!("network/{}/member/{}", network_id, member_id)
}

/// Non-empty segments of a key
pub fn segments(key: &str) -> Vec<&str> {
    key.split('/').filter(|s| !s.is_empty()).collect()
}

/// Map a key to a file under `root`, creating intermediate directories when
/// `create` is set. `None` means the key has no segments.
pub async fn local_path(root: &Path, key: &str, create: bool) -> std::io::Result<Option<PathBuf>> {
    let parts = segments(key);
    let Some((leaf, dirs)) = parts.split_last() else {
        return Ok(None);
    };

    let mut path = root.to_path_buf();
    if create {
        fs::create_dir_all(&path).await?;
    }
    for dir in dirs {
        path.push(dir);
        if create {
            fs::create_dir_all(&path).await?;
        }
    }
    path.push(format!("{}{}", leaf, DOCUMENT_SUFFIX));

    debug!(key = %key, path = %path.display(), "Mapped key to local path");
    Ok(Some(path))
}

/// Map a key to a URL path under `base_path`. Separator is always `/` and
/// no suffix is added; the control service addresses documents by key.
pub fn remote_path(base_path: &str, key: &str) -> Option<String> {
    let parts = segments(key);
    if parts.is_empty() {
        return None;
    }
    Some(format!("{}/{}", base_path.trim_end_matches('/'), parts.join("/")))
}
