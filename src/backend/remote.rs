//! HTTP control-service backend
//!
//! - `GET <base>` returns one JSON object whose values are documents
//! - `PUT <base>/<key>` stores a document; only `200 OK` counts as success
//!
//! Deletion is owned by the control service, so nothing is ever deleted
//! from here.

use super::{Backend, BackendMode, StoredDocument};
use crate::error::StoreError;
use crate::keys;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backend delegating storage to a remote control service
pub struct RemoteBackend {
    client: Client,
    /// `http://host:port`
    origin: String,
    base_path: String,
}

impl RemoteBackend {
    pub fn new(host: &str, port: u16, base_path: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        let origin = format!("http://{}:{}", host, port);

        info!(
            origin = %origin,
            base_path = %base_path,
            timeout_ms = timeout.as_millis() as u64,
            "Using remote control service store"
        );

        Ok(Self {
            client,
            origin,
            base_path: base_path.to_string(),
        })
    }

    async fn put(&self, key: &str, body: &[u8]) -> Result<StatusCode, StoreError> {
        let Some(path) = keys::remote_path(&self.base_path, key) else {
            return Err(StoreError::InvalidId(format!("empty document key '{}'", key)));
        };
        let url = format!("{}{}", self.origin, path);

        let response = self
            .client
            .put(&url)
            .header(header::CONTENT_LENGTH, body.len())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        Ok(response.status())
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn write(&self, key: &str, body: &[u8]) -> bool {
        match self.put(key, body).await {
            Ok(StatusCode::OK) => {
                debug!(key = %key, size = body.len(), "Stored document remotely");
                true
            }
            Ok(status) => {
                warn!(key = %key, status = %status, "Remote store rejected document");
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Remote store write failed");
                false
            }
        }
    }

    async fn remove(&self, key: &str) {
        debug!(key = %key, "Leaving deletion to the control service");
    }

    async fn read_all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let url = format!("{}{}", self.origin, self.base_path);
        let response = self.client.get(&url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(StoreError::UnexpectedStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let image: Value = serde_json::from_slice(&body)?;
        let Value::Object(entries) = image else {
            return Err(StoreError::MalformedDatabase(
                "database image is not a JSON object".into(),
            ));
        };

        let mut documents = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if value.is_object() {
                documents.push(StoredDocument {
                    key,
                    body: serde_json::to_vec(&value)?,
                });
            }
        }

        debug!(url = %url, count = documents.len(), "Fetched database image");
        Ok(documents)
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Delegated
    }

    fn describe(&self) -> String {
        format!("{}{}", self.origin, self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer, base_path: &str) -> RemoteBackend {
        let addr = server.address();
        RemoteBackend::new(
            &addr.ip().to_string(),
            addr.port(),
            base_path,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_success_requires_200() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/db/network/0000000000000001"))
            .and(header_eq("content-type", "application/json"))
            .and(header_eq("content-length", "2"))
            .and(body_string("{}"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/db/network/0000000000000002"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let backend = backend_for(&server, "/db").await;
        assert!(backend.write("network/0000000000000001", b"{}").await);
        assert!(!backend.write("network/0000000000000002", b"{}").await);
    }

    #[tokio::test]
    async fn test_read_all_returns_object_values() {
        let server = MockServer::start().await;
        let image = serde_json::json!({
            "a": { "id": "0000000000000001", "objtype": "network" },
            "b": { "id": "00000000a1", "objtype": "member", "nwid": "0000000000000001" },
            "c": "not a document",
        });
        Mock::given(method("GET"))
            .and(path("/db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(image))
            .mount(&server)
            .await;

        let backend = backend_for(&server, "/db").await;
        let docs = backend.read_all().await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_read_all_rejects_bad_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/truncated"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"a\": {"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/array"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let down = backend_for(&server, "/down").await;
        assert!(matches!(
            down.read_all().await,
            Err(StoreError::UnexpectedStatus(503))
        ));

        let truncated = backend_for(&server, "/truncated").await;
        assert!(matches!(truncated.read_all().await, Err(StoreError::Json(_))));

        let array = backend_for(&server, "/array").await;
        assert!(matches!(
            array.read_all().await,
            Err(StoreError::MalformedDatabase(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_sends_nothing() {
        let server = MockServer::start().await;
        let backend = backend_for(&server, "/db").await;

        backend.remove("network/0000000000000001").await;

        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty());
    }
}
