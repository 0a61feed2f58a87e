//! Integration tests for a store backed by a remote control service

use controller_store::{BackendMode, MemberId, NetworkId, NetworkStore, StoreConfig, StoreError};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn nwid() -> NetworkId {
    NetworkId::from_hex("8056c2e21c000001").unwrap()
}

fn mid(hex: &str) -> MemberId {
    MemberId::from_hex(hex).unwrap()
}

fn remote_config(server: &MockServer) -> StoreConfig {
    StoreConfig {
        load_retry_delay_ms: 10,
        ..StoreConfig::with_location(format!("{}/db", server.uri()))
    }
}

fn image() -> serde_json::Value {
    json!({
        "network/8056c2e21c000001": {
            "id": "8056c2e21c000001",
            "objtype": "network",
            "name": "lab"
        },
        "network/8056c2e21c000001/member/00000000a1": {
            "id": "00000000a1",
            "objtype": "member",
            "nwid": "8056c2e21c000001",
            "authorized": true,
            "ipAssignments": ["10.1.0.1/24"]
        },
        "network/8056c2e21c000001/member/00000000a2": {
            "id": "00000000a2",
            "objtype": "member",
            "nwid": "8056c2e21c000001",
            "authorized": false
        },
        "stray": "not a document"
    })
}

async fn mount_image(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_waits_for_service() {
    let server = MockServer::start().await;

    // First two fetches fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/db"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_image(&server).await;

    let store = NetworkStore::open(remote_config(&server)).await.unwrap();
    assert_eq!(store.mode(), BackendMode::Delegated);
    assert_eq!(store.network_ids().await, vec![nwid()]);
    assert_eq!(store.member_ids(nwid()).await, vec![mid("00000000a1"), mid("00000000a2")]);

    let gets = server.received_requests().await.unwrap();
    assert_eq!(gets.len(), 3);

    store.sync_summaries().await;
    let (summary, _) = store.summary(nwid()).await.unwrap();
    assert_eq!(summary.authorized_member_count, 1);
    assert_eq!(summary.total_member_count, 2);
    assert_eq!(
        summary.allocated_ips.iter().map(|ip| ip.to_string()).collect::<Vec<_>>(),
        vec!["10.1.0.1"]
    );

    store.shutdown().await;
}

#[tokio::test]
async fn test_open_gives_up_when_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/db"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
        .mount(&server)
        .await;

    let config = StoreConfig {
        max_load_attempts: 3,
        ..remote_config(&server)
    };
    match NetworkStore::open(config).await {
        Err(StoreError::LoadFailed { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, StoreError::MalformedDatabase(_)));
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("load should fail"),
    }
}

#[tokio::test]
async fn test_save_puts_document() {
    let server = MockServer::start().await;
    mount_image(&server).await;
    Mock::given(method("PUT"))
        .and(path("/db/network/8056c2e21c000001/member/00000000a3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = NetworkStore::open(remote_config(&server)).await.unwrap();
    let member = json!({
        "id": "00000000a3",
        "objtype": "member",
        "nwid": "8056c2e21c000001",
        "authorized": true
    });
    assert!(store.save_network_member(nwid(), mid("00000000a3"), member.clone()).await);

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|request| request.method.as_str() == "PUT")
        .unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&put.body).unwrap(), member);
    assert_eq!(
        put.headers.get("content-type").unwrap().to_str().unwrap(),
        "application/json"
    );

    store.sync_summaries().await;
    let (summary, _) = store.summary(nwid()).await.unwrap();
    assert_eq!(summary.authorized_member_count, 2);
    assert_eq!(summary.total_member_count, 3);

    store.shutdown().await;
}

#[tokio::test]
async fn test_rejected_save_still_updates_cache() {
    let server = MockServer::start().await;
    mount_image(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex("^/db/network/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = NetworkStore::open(remote_config(&server)).await.unwrap();
    let config = json!({ "id": "8056c2e21c000001", "objtype": "network", "name": "renamed" });

    assert!(!store.save_network(nwid(), config.clone()).await);
    assert_eq!(store.network_config(nwid()).await, Some(config));

    store.shutdown().await;
}

#[tokio::test]
async fn test_erase_leaves_service_untouched() {
    let server = MockServer::start().await;
    mount_image(&server).await;

    let store = NetworkStore::open(remote_config(&server)).await.unwrap();

    let removed = store
        .erase_network_member(nwid(), mid("00000000a2"), true)
        .await
        .unwrap();
    assert_eq!(removed["authorized"], json!(false));

    let removed = store.erase_network(nwid()).await.unwrap();
    assert_eq!(removed["name"], json!("lab"));
    assert!(!store.has_network(nwid()).await);
    assert!(store.network_ids().await.is_empty());

    // Only the startup fetch ever reached the service
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "GET");

    store.shutdown().await;
}
