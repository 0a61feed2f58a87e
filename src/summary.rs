//! Network summary computation
//!
//! Summaries are derived from a network's member documents and are always
//! rebuilt from a full scan, never patched. Recomputation runs on one
//! background task fed by a FIFO channel so writers never wait on it:
//!
//! ```text
//! save/erase member ──► SummaryScheduler::schedule ──► mpsc ──► worker task
//!                                                                 │
//!                              RecordCache::recompute ◄───────────┘
//! ```

use crate::cache::RecordCache;
use crate::document::{value_u64, DocumentExt};
use crate::ids::{MemberId, NetworkId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Aggregate membership statistics for one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInfo {
    /// Authorized members flagged as active bridges
    pub active_bridges: BTreeSet<MemberId>,
    /// Addresses assigned to authorized members
    pub allocated_ips: BTreeSet<IpAddr>,
    pub authorized_member_count: u64,
    pub active_member_count: u64,
    pub total_member_count: u64,
    /// Latest `lastDeauthorizedTime` among unauthorized members
    pub most_recent_deauth_time: u64,
}

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Build a summary from a full scan of `members`.
///
/// Each field is read through a defaulted accessor, so a malformed field
/// drops only its own contribution.
pub fn compute(members: &HashMap<MemberId, Value>, now: u64, active_window_ms: u64) -> SummaryInfo {
    let mut summary = SummaryInfo::default();

    for (member_id, member) in members {
        if member.bool_or("authorized", false) {
            summary.authorized_member_count += 1;

            if recently_active(member, now, active_window_ms) {
                summary.active_member_count += 1;
            }

            if member.bool_or("activeBridge", false) {
                summary.active_bridges.insert(*member_id);
            }

            summary
                .allocated_ips
                .extend(member.array("ipAssignments").iter().filter_map(parse_assignment));
        } else {
            summary.most_recent_deauth_time = summary
                .most_recent_deauth_time
                .max(member.u64_or("lastDeauthorizedTime", 0));
        }

        summary.total_member_count += 1;
    }

    summary
}

/// Whether the member's newest log entry falls inside the window
fn recently_active(member: &Value, now: u64, active_window_ms: u64) -> bool {
    let Some(entry) = member.array("recentLog").first().filter(|e| e.is_object()) else {
        return false;
    };
    let ts = value_u64(entry.get("ts"), 0);
    now.checked_sub(ts).map_or(false, |age| age < active_window_ms)
}

/// Parse an assignment such as `10.0.0.5`, `fd00::1` or `10.0.0.5/24`
fn parse_assignment(value: &Value) -> Option<IpAddr> {
    let s = value.as_str()?.trim();
    s.parse()
        .ok()
        .or_else(|| s.split_once('/').and_then(|(ip, _)| ip.parse().ok()))
}

/// Messages understood by the summary worker
#[derive(Debug)]
pub enum SummaryCommand {
    /// Rebuild one network's summary
    Recompute(NetworkId),
    /// Acknowledge once every earlier message has been handled
    Barrier(oneshot::Sender<()>),
    /// Stop the worker
    Shutdown,
}

struct Worker {
    tx: mpsc::UnboundedSender<SummaryCommand>,
    handle: JoinHandle<()>,
}

/// Owns the lazily started summary worker
pub struct SummaryScheduler {
    cache: Arc<RecordCache>,
    active_window_ms: u64,
    /// Worker lifecycle lock; also serializes posting
    worker: Mutex<Option<Worker>>,
}

impl SummaryScheduler {
    pub fn new(cache: Arc<RecordCache>, active_window_ms: u64) -> Self {
        Self {
            cache,
            active_window_ms,
            worker: Mutex::new(None),
        }
    }

    /// Queue a recompute of `network_id`, starting the worker on first use
    pub async fn schedule(&self, network_id: NetworkId) {
        let mut worker = self.worker.lock().await;
        let worker = worker.get_or_insert_with(|| self.spawn());
        if worker.tx.send(SummaryCommand::Recompute(network_id)).is_err() {
            warn!(network_id = %network_id, "Summary worker is gone, dropping recompute");
        }
    }

    /// Wait until everything queued so far has been processed
    pub async fn sync(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let worker = self.worker.lock().await;
            let Some(worker) = worker.as_ref() else {
                return;
            };
            if worker.tx.send(SummaryCommand::Barrier(ack_tx)).is_err() {
                return;
            }
        }
        ack_rx.await.ok();
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Stop the worker after its current item and wait for it to exit
    pub async fn shutdown(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        worker.tx.send(SummaryCommand::Shutdown).ok();
        if let Err(e) = worker.handle.await {
            warn!(error = %e, "Summary worker ended abnormally");
        }
    }

    fn spawn(&self) -> Worker {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Arc::clone(&self.cache);
        let active_window_ms = self.active_window_ms;

        let handle = tokio::spawn(async move {
            run_worker(cache, active_window_ms, rx).await;
        });

        info!(active_window_ms, "Started summary worker");
        Worker { tx, handle }
    }
}

async fn run_worker(
    cache: Arc<RecordCache>,
    active_window_ms: u64,
    mut rx: mpsc::UnboundedReceiver<SummaryCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SummaryCommand::Recompute(network_id) => {
                if cache.recompute(network_id, now_ms(), active_window_ms).await {
                    debug!(network_id = %network_id, "Recomputed summary");
                } else {
                    debug!(network_id = %network_id, "Network gone, skipping summary");
                }
            }
            SummaryCommand::Barrier(ack) => {
                ack.send(()).ok();
            }
            SummaryCommand::Shutdown => break,
        }
    }

    info!("Summary worker stopped");
}
