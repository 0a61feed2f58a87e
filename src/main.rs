//! controller-store: inspect and edit a controller's network store
//!
//! ## Usage
//!
//! ```bash
//! # List networks in a local store
//! controller-store --location /var/lib/controller.d networks
//!
//! # Membership summary of one network, from a remote control service
//! controller-store --location http://127.0.0.1:8080/db summary 8056c2e21c000001
//!
//! # Save a member document
//! controller-store put-member 8056c2e21c000001 00000000a1 member.json
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use controller_store::{MemberId, NetworkId, NetworkStore, StoreConfig};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "controller-store")]
#[command(about = "Inspect and edit a network controller's configuration store")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store directory or http://host:port/path of a control service
    #[arg(long, env = "CONTROLLER_STORE_LOCATION")]
    location: Option<String>,

    /// Give up after this many load attempts (0 = wait forever)
    #[arg(long)]
    load_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List networks with their member counts
    Networks,

    /// Print a network's membership summary
    Summary { network_id: NetworkId },

    /// Print a network or member document
    Show {
        network_id: NetworkId,
        #[arg(long)]
        member: Option<MemberId>,
    },

    /// Save a network document read from a JSON file
    PutNetwork { network_id: NetworkId, file: PathBuf },

    /// Save a member document read from a JSON file
    PutMember {
        network_id: NetworkId,
        member_id: MemberId,
        file: PathBuf,
    },

    /// Erase a network and its members
    EraseNetwork { network_id: NetworkId },

    /// Erase one member
    EraseMember {
        network_id: NetworkId,
        member_id: MemberId,
    },
}

fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    if !doc.is_object() {
        bail!("{} does not contain a JSON object", path.display());
    }
    Ok(doc)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("controller_store=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(location) = args.location {
        config.location = location;
    }
    if let Some(attempts) = args.load_attempts {
        config.max_load_attempts = attempts;
    }

    info!(location = %config.location, "Opening store");
    let store = NetworkStore::open(config).await?;

    let outcome = run(&store, args.command).await;
    store.shutdown().await;
    outcome
}

async fn run(store: &NetworkStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Networks => {
            let mut rows = Vec::new();
            for network_id in store.network_ids().await {
                rows.push(json!({
                    "id": network_id,
                    "members": store.member_ids(network_id).await.len(),
                }));
            }
            print_json(&Value::Array(rows))
        }
        Command::Summary { network_id } => {
            store.sync_summaries().await;
            let Some((summary, computed_at)) = store.summary(network_id).await else {
                bail!("network {} not found", network_id);
            };
            print_json(&json!({
                "id": network_id,
                "summary": summary,
                "computedAt": computed_at,
            }))
        }
        Command::Show { network_id, member } => {
            let doc = match member {
                Some(member_id) => store.network_member(network_id, member_id).await,
                None => store.network_config(network_id).await,
            };
            match doc {
                Some(doc) => print_json(&doc),
                None => bail!("not found"),
            }
        }
        Command::PutNetwork { network_id, file } => {
            let doc = read_document(&file)?;
            if !store.save_network(network_id, doc).await {
                bail!("backend rejected network {}", network_id);
            }
            Ok(())
        }
        Command::PutMember {
            network_id,
            member_id,
            file,
        } => {
            let doc = read_document(&file)?;
            if !store.save_network_member(network_id, member_id, doc).await {
                bail!("backend rejected member {}/{}", network_id, member_id);
            }
            store.sync_summaries().await;
            Ok(())
        }
        Command::EraseNetwork { network_id } => match store.erase_network(network_id).await {
            Some(_) => Ok(()),
            None => bail!("network {} not found", network_id),
        },
        Command::EraseMember {
            network_id,
            member_id,
        } => match store.erase_network_member(network_id, member_id, true).await {
            Some(_) => Ok(()),
            None => bail!("member {}/{} not found", network_id, member_id),
        },
    }
}
