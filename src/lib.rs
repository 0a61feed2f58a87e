//! Controller Store - persistent configuration store for a network controller
//!
//! Holds per-network and per-member configuration documents, serves all
//! reads from an in-memory cache, and keeps per-network membership
//! summaries up to date on a background task.
//!
//! ## Backends
//!
//! | Location string | Backend | Deletes documents |
//! |-----------------|---------|-------------------|
//! | `/var/lib/controller.d` | local JSON tree (authoritative) | yes |
//! | `http://127.0.0.1:8080/db` | remote control service (delegated) | no, the service does |
//!
//! ## Storage Layout (local)
//!
//! ```text
//! controller.d/
//! └── network/
//!     ├── <nwid>.json                 # network config, objtype "network"
//!     └── <nwid>/member/<mid>.json    # member config, objtype "member"
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let store = NetworkStore::open(StoreConfig::with_location("/var/lib/controller.d")).await?;
//! store.save_network_member(nwid, mid, member_json).await;
//! store.sync_summaries().await;
//! let (summary, computed_at) = store.summary(nwid).await.unwrap();
//! store.shutdown().await;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod ids;
pub mod keys;
pub mod loader;
pub mod store;
pub mod summary;

// Re-exports
pub use backend::{Backend, BackendMode, LocalBackend, RemoteBackend, StoredDocument};
pub use cache::{NetworkRecord, RecordCache};
pub use config::{Location, StoreConfig};
pub use document::DocumentExt;
pub use error::StoreError;
pub use ids::{MemberId, NetworkId};
pub use loader::{LoadStats, LoadedDocument};
pub use store::NetworkStore;
pub use summary::{SummaryCommand, SummaryInfo, SummaryScheduler};
