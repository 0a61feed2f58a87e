//! In-memory record cache
//!
//! All network and member documents live here once loaded; every read
//! during normal operation is served from this map. One mutex guards the
//! whole map and is never held across backend I/O.

use crate::ids::{MemberId, NetworkId};
use crate::summary::{self, SummaryInfo};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Cached state of one network
#[derive(Debug, Clone, Default)]
pub struct NetworkRecord {
    /// Network-level settings document
    pub config: Value,
    /// Member documents by address
    pub members: HashMap<MemberId, Value>,
    /// Last computed membership summary
    pub summary: SummaryInfo,
    /// When `summary` was computed (Unix millis, 0 = never)
    pub summary_computed_at: u64,
}

/// Lock-guarded map of network records
#[derive(Default)]
pub struct RecordCache {
    networks: Mutex<HashMap<NetworkId, NetworkRecord>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a network's config, creating the record if needed
    pub async fn set_config(&self, network_id: NetworkId, config: Value) {
        let mut networks = self.networks.lock().await;
        networks.entry(network_id).or_default().config = config;
    }

    /// Insert or replace a member, creating the network record if needed
    pub async fn set_member(&self, network_id: NetworkId, member_id: MemberId, member: Value) {
        let mut networks = self.networks.lock().await;
        networks
            .entry(network_id)
            .or_default()
            .members
            .insert(member_id, member);
    }

    /// Remove a member, returning its document if it was present
    pub async fn remove_member(&self, network_id: NetworkId, member_id: MemberId) -> Option<Value> {
        let mut networks = self.networks.lock().await;
        networks.get_mut(&network_id)?.members.remove(&member_id)
    }

    /// Remove a network together with all its members
    pub async fn remove_network(&self, network_id: NetworkId) -> Option<NetworkRecord> {
        let removed = self.networks.lock().await.remove(&network_id);
        if let Some(ref record) = removed {
            debug!(
                network_id = %network_id,
                members = record.members.len(),
                "Evicted network"
            );
        }
        removed
    }

    /// Rebuild a network's summary from a full scan of its members.
    /// Returns false if the network is not cached.
    pub async fn recompute(&self, network_id: NetworkId, now: u64, active_window_ms: u64) -> bool {
        let mut networks = self.networks.lock().await;
        let Some(record) = networks.get_mut(&network_id) else {
            return false;
        };
        record.summary = summary::compute(&record.members, now, active_window_ms);
        record.summary_computed_at = now;
        true
    }

    pub async fn contains(&self, network_id: NetworkId) -> bool {
        self.networks.lock().await.contains_key(&network_id)
    }

    pub async fn record(&self, network_id: NetworkId) -> Option<NetworkRecord> {
        self.networks.lock().await.get(&network_id).cloned()
    }

    pub async fn config(&self, network_id: NetworkId) -> Option<Value> {
        self.networks
            .lock()
            .await
            .get(&network_id)
            .map(|record| record.config.clone())
    }

    pub async fn member(&self, network_id: NetworkId, member_id: MemberId) -> Option<Value> {
        self.networks
            .lock()
            .await
            .get(&network_id)?
            .members
            .get(&member_id)
            .cloned()
    }

    /// All member documents of a network, ordered by address
    pub async fn members(&self, network_id: NetworkId) -> Vec<(MemberId, Value)> {
        let networks = self.networks.lock().await;
        let mut members: Vec<_> = networks
            .get(&network_id)
            .map(|record| {
                record
                    .members
                    .iter()
                    .map(|(id, doc)| (*id, doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by_key(|(id, _)| *id);
        members
    }

    pub async fn member_ids(&self, network_id: NetworkId) -> Vec<MemberId> {
        let networks = self.networks.lock().await;
        let mut ids: Vec<_> = networks
            .get(&network_id)
            .map(|record| record.members.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Summary and its computation time
    pub async fn summary(&self, network_id: NetworkId) -> Option<(SummaryInfo, u64)> {
        self.networks
            .lock()
            .await
            .get(&network_id)
            .map(|record| (record.summary.clone(), record.summary_computed_at))
    }

    pub async fn network_ids(&self) -> Vec<NetworkId> {
        let mut ids: Vec<_> = self.networks.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.networks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.networks.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.networks.lock().await.clear();
    }
}
