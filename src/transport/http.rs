//! HTTP transport: reqwest clients for the participant and coordinator RPCs,
//! and a registry that resolves `host:port` by asking the server what it serves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::common::{DeleteOutcome, GetOutcome, PhaseRequest, PutOutcome, TxnRequest};
use crate::transport::wire::{
    AckResponse, ClientReply, ConnectRequest, ConnectResponse, HealthResponse,
    InfoResponse, KeyQuery, PrepareResponse, PutBody, VoteResponse, ABORT_PATH, COMMIT_PATH,
    COORDINATOR_CONNECT_PATH, COORDINATOR_PREPARE_PATH, HEALTH_PATH, INFO_PATH, KV_PATH,
    PREPARE_PATH,
};
use crate::transport::{CoordinatorRpc, ParticipantRpc, Registry, TransportError};

fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| TransportError::ConnectionFailed(format!("HTTP client setup: {}", e)))
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::ConnectionFailed(e.to_string())
    }
}

/// Send and decode, treating any non-2xx status as a failure.
async fn call<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, TransportError> {
    let response = request.send().await.map_err(map_send_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Remote(format!("HTTP {}", status)));
    }
    response.json::<T>().await.map_err(map_send_error)
}

/// Send and decode a client reply. Non-2xx statuses still carry an outcome.
async fn call_client<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, TransportError> {
    let response = request.send().await.map_err(map_send_error)?;
    let status = response.status();
    response
        .json::<ClientReply<T>>()
        .await
        .map(|reply| reply.outcome)
        .map_err(|e| {
            if status.is_success() {
                map_send_error(e)
            } else {
                TransportError::Remote(format!("HTTP {}", status))
            }
        })
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Client for a participant's RPC and key-value endpoints
#[derive(Clone)]
pub struct HttpParticipantClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpParticipantClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: normalize_base_url(base_url),
            client: build_client(timeout)?,
        })
    }

    pub fn for_addr(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self, TransportError> {
        Self::new(format!("http://{}:{}", host, port), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Which service this participant answers for, and on which port
    pub async fn info(&self) -> Result<InfoResponse, TransportError> {
        call(self.client.get(format!("{}{}", self.base_url, INFO_PATH))).await
    }

    /// Keys travel in the query string. A path segment would be rewritten by
    /// URL normalization for keys such as `.`, `..` or `a\b`.
    fn kv_url(&self) -> String {
        format!("{}{}", self.base_url, KV_PATH)
    }

    fn key_query(key: &str, client: &str) -> KeyQuery {
        KeyQuery {
            key: key.to_string(),
            client: client.to_string(),
        }
    }
}

#[async_trait]
impl ParticipantRpc for HttpParticipantClient {
    async fn prepare(&self, req: PhaseRequest) -> Result<bool, TransportError> {
        let url = format!("{}{}", self.base_url, PREPARE_PATH);
        let response: VoteResponse = call(self.client.post(url).json(&req)).await?;
        Ok(response.vote)
    }

    async fn commit(&self, req: PhaseRequest) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, COMMIT_PATH);
        let _: AckResponse = call(self.client.post(url).json(&req)).await?;
        Ok(())
    }

    async fn abort(&self) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, ABORT_PATH);
        let _: AckResponse = call(self.client.post(url)).await?;
        Ok(())
    }

    async fn get(&self, key: &str, client: &str) -> Result<GetOutcome, TransportError> {
        let query = Self::key_query(key, client);
        call_client(self.client.get(self.kv_url()).query(&query)).await
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        client: &str,
    ) -> Result<PutOutcome, TransportError> {
        let body = PutBody {
            value: value.to_string(),
            client: client.to_string(),
        };
        let query = Self::key_query(key, client);
        call_client(self.client.put(self.kv_url()).query(&query).json(&body)).await
    }

    async fn delete(&self, key: &str, client: &str) -> Result<DeleteOutcome, TransportError> {
        let query = Self::key_query(key, client);
        call_client(self.client.delete(self.kv_url()).query(&query)).await
    }
}

/// Client for the coordinator's endpoints
#[derive(Clone)]
pub struct HttpCoordinatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCoordinatorClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: normalize_base_url(base_url),
            client: build_client(timeout)?,
        })
    }

    /// Ask the coordinator to add replicas to its set
    pub async fn connect(
        &self,
        hosts: Vec<String>,
        ports: Vec<u16>,
        service_name: &str,
    ) -> Result<ConnectResponse, TransportError> {
        let body = ConnectRequest {
            hosts,
            ports,
            service_name: service_name.to_string(),
        };
        let url = format!("{}{}", self.base_url, COORDINATOR_CONNECT_PATH);
        call(self.client.post(url).json(&body)).await
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        call(self.client.get(format!("{}{}", self.base_url, HEALTH_PATH))).await
    }
}

#[async_trait]
impl CoordinatorRpc for HttpCoordinatorClient {
    async fn initiate_prepare_phase(&self, txn: TxnRequest) -> Result<bool, TransportError> {
        let url = format!("{}{}", self.base_url, COORDINATOR_PREPARE_PATH);
        let response: PrepareResponse = call(self.client.post(url).json(&txn)).await?;
        Ok(response.committed)
    }
}

/// Resolves participants over HTTP. A lookup succeeds only if the server at
/// the address reports the requested service name.
#[derive(Debug, Clone, Default)]
pub struct HttpRegistry {
    timeout: Option<Duration>,
}

impl HttpRegistry {
    /// `timeout` applies to every call made through the resolved handles
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn lookup(
        &self,
        host: &str,
        port: u16,
        service_name: &str,
    ) -> Result<Arc<dyn ParticipantRpc>, TransportError> {
        let client = HttpParticipantClient::for_addr(host, port, self.timeout)?;
        let info = client.info().await?;
        if info.service != service_name {
            return Err(TransportError::NotBound {
                service: service_name.to_string(),
                addr: format!("{}:{}", host, port),
            });
        }
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// An address nothing listens on
    async fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = HttpParticipantClient::new("http://127.0.0.1:5001/", None).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5001");
        assert_eq!(client.kv_url(), "http://127.0.0.1:5001/kv");
    }

    #[test]
    fn test_key_travels_in_query_string() {
        let client = HttpParticipantClient::new("http://127.0.0.1:5001", None).unwrap();
        for key in [".", "..", "a\\b", "users/42 profile?tab=1&x"] {
            let request = client
                .client
                .get(client.kv_url())
                .query(&HttpParticipantClient::key_query(key, "alice"))
                .build()
                .unwrap();
            assert_eq!(request.url().path(), "/kv");
            let pairs: Vec<(String, String)> = request
                .url()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            assert_eq!(
                pairs,
                vec![
                    ("key".to_string(), key.to_string()),
                    ("client".to_string(), "alice".to_string())
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_participant_is_communication_failure() {
        let port = dead_port().await;
        let client =
            HttpParticipantClient::for_addr("127.0.0.1", port, Some(Duration::from_secs(2)))
                .unwrap();

        let result = client
            .prepare(PhaseRequest {
                txn: TxnRequest::put("a", "1"),
                port,
            })
            .await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed(_)) | Err(TransportError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_registry_lookup_of_dead_address_fails() {
        let port = dead_port().await;
        let registry = HttpRegistry::new(Some(Duration::from_secs(2)));
        assert!(registry.lookup("127.0.0.1", port, "replkv").await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_coordinator() {
        let port = dead_port().await;
        let client = HttpCoordinatorClient::new(
            format!("http://127.0.0.1:{}", port),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        assert!(client
            .initiate_prepare_phase(TxnRequest::delete("a"))
            .await
            .is_err());
    }
}
