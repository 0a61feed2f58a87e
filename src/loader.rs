//! Startup bulk load
//!
//! Reads every document from the backend, classifies it by its `objtype`
//! tag and `id`, and installs it in the record cache. Locally a bad file is
//! skipped; remotely a bad fetch fails the whole attempt before anything is
//! applied, and the caller retries until the store becomes readable.

use crate::backend::Backend;
use crate::cache::RecordCache;
use crate::config::StoreConfig;
use crate::document::{DocumentExt, OBJTYPE_MEMBER, OBJTYPE_NETWORK};
use crate::error::StoreError;
use crate::ids::{MemberId, NetworkId};
use serde_json::Value;
use tracing::{debug, info, warn};

/// A document recognised as a network or member
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedDocument {
    Network {
        network_id: NetworkId,
        config: Value,
    },
    Member {
        network_id: NetworkId,
        member_id: MemberId,
        config: Value,
    },
}

/// Counts from one successful load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub networks: usize,
    pub members: usize,
    pub skipped: usize,
}

/// Classify a parsed document. Anything without a recognised tag and a
/// well-formed non-zero id is `None`.
pub fn classify(doc: Value) -> Option<LoadedDocument> {
    if !doc.is_object() {
        return None;
    }

    let id = doc.str_or("id", "0");
    let objtype = doc.str_or("objtype", "");

    match objtype.as_str() {
        OBJTYPE_NETWORK => {
            let network_id = NetworkId::from_hex(&id)?;
            Some(LoadedDocument::Network {
                network_id,
                config: doc,
            })
        }
        OBJTYPE_MEMBER => {
            let member_id = MemberId::from_hex(&id)?;
            let network_id = NetworkId::from_hex_lenient(&doc.str_or("nwid", "0"))?;
            Some(LoadedDocument::Member {
                network_id,
                member_id,
                config: doc,
            })
        }
        _ => None,
    }
}

/// Parse and classify a raw document body
pub fn classify_bytes(body: &[u8]) -> Option<LoadedDocument> {
    serde_json::from_slice(body).ok().and_then(classify)
}

/// One load attempt
pub async fn load(backend: &dyn Backend, cache: &RecordCache) -> Result<LoadStats, StoreError> {
    let documents = backend.read_all().await?;
    let mut stats = LoadStats::default();

    for document in documents {
        match classify_bytes(&document.body) {
            Some(LoadedDocument::Network { network_id, config }) => {
                cache.set_config(network_id, config).await;
                stats.networks += 1;
            }
            Some(LoadedDocument::Member {
                network_id,
                member_id,
                config,
            }) => {
                cache.set_member(network_id, member_id, config).await;
                stats.members += 1;
            }
            None => {
                debug!(key = %document.key, "Skipping unrecognised document");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

/// Load until the backend is readable.
///
/// Retries forever with a fixed delay unless `max_load_attempts` is set,
/// warning every `load_warn_every` failures.
pub async fn load_with_retry(
    backend: &dyn Backend,
    cache: &RecordCache,
    config: &StoreConfig,
) -> Result<LoadStats, StoreError> {
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match load(backend, cache).await {
            Ok(stats) => {
                info!(
                    location = %backend.describe(),
                    networks = stats.networks,
                    members = stats.members,
                    skipped = stats.skipped,
                    attempts,
                    "Loaded store"
                );
                return Ok(stats);
            }
            Err(e) => {
                if config.max_load_attempts > 0 && attempts >= config.max_load_attempts {
                    return Err(StoreError::LoadFailed {
                        attempts,
                        last: Box::new(e),
                    });
                }

                if warn_due(attempts, config.load_warn_every) {
                    warn!(
                        location = %backend.describe(),
                        attempts,
                        error = %e,
                        "Controller still waiting to read store"
                    );
                } else {
                    debug!(attempts, error = %e, "Store not readable yet");
                }
            }
        }

        tokio::time::sleep(config.load_retry_delay()).await;
    }
}

/// Whether failed attempt number `attempts` should be logged as a warning
fn warn_due(attempts: u32, warn_every: u32) -> bool {
    warn_every > 0 && attempts % warn_every == 0
}
