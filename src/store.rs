//! Network configuration store
//!
//! [`NetworkStore`] keeps the backend and the record cache in lockstep:
//! every save writes through to the backend first (outside the cache lock),
//! then updates the cache, then schedules a summary recompute if members
//! changed. A failed backend write is logged and reported but never rolls
//! back the cache.

use crate::backend::{self, Backend, BackendMode};
use crate::cache::{NetworkRecord, RecordCache};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::ids::{MemberId, NetworkId};
use crate::keys::{member_key, network_key};
use crate::loader;
use crate::summary::{SummaryInfo, SummaryScheduler};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct NetworkStore {
    backend: Box<dyn Backend>,
    cache: Arc<RecordCache>,
    summaries: SummaryScheduler,
}

impl NetworkStore {
    /// Open the store at `config.location`, blocking until it can be read
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let backend = backend::open(&config).await?;
        Self::with_backend(backend, &config).await
    }

    /// Open over an already constructed backend
    pub async fn with_backend(backend: Box<dyn Backend>, config: &StoreConfig) -> Result<Self, StoreError> {
        let cache = Arc::new(RecordCache::new());
        loader::load_with_retry(backend.as_ref(), &cache, config).await?;

        let summaries = SummaryScheduler::new(Arc::clone(&cache), config.active_window_ms());
        let store = Self {
            backend,
            cache,
            summaries,
        };

        for network_id in store.cache.network_ids().await {
            store.summaries.schedule(network_id).await;
        }

        info!(
            location = %store.backend.describe(),
            mode = ?store.backend.mode(),
            "Network store ready"
        );
        Ok(store)
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    /// Write a serialized document straight to the backend
    pub async fn write_raw(&self, key: &str, body: &[u8]) -> bool {
        self.backend.write(key, body).await
    }

    /// Persist a network's config and cache it.
    ///
    /// Returns whether the backend accepted the write; the cache is updated
    /// either way. Network config does not feed the summary, so no
    /// recompute is scheduled.
    pub async fn save_network(&self, network_id: NetworkId, config: Value) -> bool {
        let written = self
            .write_raw(&network_key(network_id), config.to_string().as_bytes())
            .await;
        if !written {
            warn!(network_id = %network_id, "Network not persisted, keeping cached copy");
        }

        self.cache.set_config(network_id, config).await;
        debug!(network_id = %network_id, "Saved network");
        written
    }

    /// Persist a member, cache it, and schedule a summary recompute
    pub async fn save_network_member(&self, network_id: NetworkId, member_id: MemberId, config: Value) -> bool {
        let written = self
            .write_raw(&member_key(network_id, member_id), config.to_string().as_bytes())
            .await;
        if !written {
            warn!(
                network_id = %network_id,
                member_id = %member_id,
                "Member not persisted, keeping cached copy"
            );
        }

        self.cache.set_member(network_id, member_id, config).await;
        self.summaries.schedule(network_id).await;
        debug!(network_id = %network_id, member_id = %member_id, "Saved member");
        written
    }

    /// Remove a network and all of its members.
    ///
    /// In authoritative mode member documents are deleted one by one first;
    /// in delegated mode the control service deletes them and only the cache
    /// is cleaned. Returns the removed config, or `None` if unknown.
    pub async fn erase_network(&self, network_id: NetworkId) -> Option<Value> {
        if self.mode() == BackendMode::Authoritative {
            if !self.cache.contains(network_id).await {
                return None;
            }
            for member_id in self.cache.member_ids(network_id).await {
                self.erase_network_member(network_id, member_id, false).await;
            }
        }

        self.backend.remove(&network_key(network_id)).await;

        let removed = self.cache.remove_network(network_id).await?;
        info!(network_id = %network_id, "Erased network");
        Some(removed.config)
    }

    /// Remove one member. Returns its document, or `None` if unknown.
    pub async fn erase_network_member(
        &self,
        network_id: NetworkId,
        member_id: MemberId,
        recompute: bool,
    ) -> Option<Value> {
        self.backend.remove(&member_key(network_id, member_id)).await;

        let removed = self.cache.remove_member(network_id, member_id).await?;
        if recompute {
            self.summaries.schedule(network_id).await;
        }
        debug!(network_id = %network_id, member_id = %member_id, "Erased member");
        Some(removed)
    }

    pub async fn has_network(&self, network_id: NetworkId) -> bool {
        self.cache.contains(network_id).await
    }

    pub async fn network_config(&self, network_id: NetworkId) -> Option<Value> {
        self.cache.config(network_id).await
    }

    pub async fn network_member(&self, network_id: NetworkId, member_id: MemberId) -> Option<Value> {
        self.cache.member(network_id, member_id).await
    }

    /// Member documents of a network, ordered by address
    pub async fn network_members(&self, network_id: NetworkId) -> Vec<(MemberId, Value)> {
        self.cache.members(network_id).await
    }

    pub async fn member_ids(&self, network_id: NetworkId) -> Vec<MemberId> {
        self.cache.member_ids(network_id).await
    }

    pub async fn network_ids(&self) -> Vec<NetworkId> {
        self.cache.network_ids().await
    }

    /// Last computed summary and when it was computed (Unix millis).
    /// May lag recent member writes; see [`NetworkStore::sync_summaries`].
    pub async fn summary(&self, network_id: NetworkId) -> Option<(SummaryInfo, u64)> {
        self.cache.summary(network_id).await
    }

    /// Snapshot of a whole network record
    pub async fn network_record(&self, network_id: NetworkId) -> Option<NetworkRecord> {
        self.cache.record(network_id).await
    }

    /// Wait for every summary recompute queued so far
    pub async fn sync_summaries(&self) {
        self.summaries.sync().await;
    }

    /// Drop the cache and stop the summary worker. Nothing is written back.
    pub async fn shutdown(self) {
        self.cache.clear().await;
        self.summaries.shutdown().await;
        info!(location = %self.backend.describe(), "Network store closed");
    }
}
