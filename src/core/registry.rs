/// HTTP client for the service registry API
///
/// Every call maps to exactly one request. There are no retries: a failed
/// call is reported to the operator, who re-triggers it by hand.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::core::models::{ClientRecord, ErrorBody, Registration};
use crate::utils::REQUEST_TIMEOUT;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raw chunks of a service's log output, in arrival order
pub type LogStream = BoxStream<'static, Result<Bytes, RegistryError>>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry answered with a non-2xx status
    #[error("registry returned {status}{}", format_detail(.detail))]
    Http {
        status: StatusCode,
        detail: Option<String>,
    },

    /// The request never completed (offline, DNS, refused, timeout)
    #[error("request failed: {0}")]
    Network(#[source] BoxError),

    /// A success response whose body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(#[source] BoxError),

    #[error("invalid registry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

fn format_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl RegistryError {
    pub fn is_network(&self) -> bool {
        matches!(self, RegistryError::Network(_))
    }
}

/// Operations the dashboard performs against the registry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// `GET /clients`
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, RegistryError>;

    /// `POST /clients`
    async fn register(&self, registration: &Registration) -> Result<(), RegistryError>;

    /// `POST /clients/{name}/start`
    async fn start(&self, name: &str) -> Result<(), RegistryError>;

    /// `POST /clients/{name}/stop`
    async fn stop(&self, name: &str) -> Result<(), RegistryError>;

    /// `DELETE /clients/{name}`
    async fn delete(&self, name: &str) -> Result<(), RegistryError>;

    /// `GET /clients/{name}/logs`, as a chunk stream
    async fn stream_logs(&self, name: &str) -> Result<LogStream, RegistryError>;
}

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    // No overall timeout: log streams stay open until the registry ends them
    stream_client: Client,
    base_url: Url,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Network(e.into()))?;
        let stream_client = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Network(e.into()))?;

        Ok(Self {
            client,
            stream_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/clients[/segments...]`. Each segment is percent-encoded
    /// on its own, so a service name can never alter the path structure.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("clients").extend(segments);
        }
        url
    }

    /// Turn a non-2xx response into `RegistryError::Http`
    async fn check(response: Response) -> Result<Response, RegistryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // An unreadable body just means there is no detail to show. The server
        // did answer, so this stays an Http error and never becomes Network.
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message());

        debug!(%status, ?detail, "registry request rejected");
        Err(RegistryError::Http { status, detail })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, RegistryError> {
        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.into()))?;
        Self::check(response).await
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, RegistryError> {
        let response = self.send(self.client.get(self.endpoint(&[]))).await?;
        response
            .json::<Vec<ClientRecord>>()
            .await
            .map_err(|e| RegistryError::Decode(e.into()))
    }

    async fn register(&self, registration: &Registration) -> Result<(), RegistryError> {
        self.send(self.client.post(self.endpoint(&[])).json(registration))
            .await?;
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), RegistryError> {
        self.send(self.client.post(self.endpoint(&[name, "start"])))
            .await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RegistryError> {
        self.send(self.client.post(self.endpoint(&[name, "stop"])))
            .await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), RegistryError> {
        self.send(self.client.delete(self.endpoint(&[name])))
            .await?;
        Ok(())
    }

    async fn stream_logs(&self, name: &str) -> Result<LogStream, RegistryError> {
        let response = self
            .send(self.stream_client.get(self.endpoint(&[name, "logs"])))
            .await?;

        Ok(response
            .bytes_stream()
            .map_err(|e| RegistryError::Network(e.into()))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::{Path, State},
        http::StatusCode as AxumStatus,
        routing::{delete, get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    async fn list(State(seen): State<Seen>) -> Json<Value> {
        seen.requests.lock().unwrap().push("GET /clients".to_string());
        Json(json!([
            {"serviceName": "orders", "running": true, "httpPort": 8080, "securePort": 8443,
             "leaseInfo": {"renewalIntervalInSecs": 30, "durationInSecs": 90}},
            {"serviceName": "BILLING", "running": false}
        ]))
    }

    async fn create(State(seen): State<Seen>, Json(body): Json<Value>) -> AxumStatus {
        seen.bodies.lock().unwrap().push(body);
        AxumStatus::OK
    }

    async fn start(State(seen): State<Seen>, Path(name): Path<String>) -> (AxumStatus, Json<Value>) {
        seen.requests.lock().unwrap().push(format!("start {}", name));
        if name == "orders" {
            (AxumStatus::CONFLICT, Json(json!({"detail": "already running"})))
        } else {
            (AxumStatus::OK, Json(json!({"message": "started"})))
        }
    }

    async fn stop(Path(_name): Path<String>) -> (AxumStatus, &'static str) {
        (AxumStatus::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn remove(State(seen): State<Seen>, Path(name): Path<String>) -> AxumStatus {
        seen.requests.lock().unwrap().push(format!("delete {}", name));
        AxumStatus::OK
    }

    async fn logs(Path(_name): Path<String>) -> Body {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"line 1\n")),
            Ok(Bytes::from_static(b"line 2\n")),
        ];
        Body::from_stream(futures::stream::iter(chunks))
    }

    async fn spawn_registry() -> (RegistryClient, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route("/clients", get(list).post(create))
            .route("/clients/:name", delete(remove))
            .route("/clients/:name/start", post(start))
            .route("/clients/:name/stop", post(stop))
            .route("/clients/:name/logs", get(logs))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = RegistryClient::new(&format!("http://{}", addr)).unwrap();
        (client, seen)
    }

    #[test]
    fn test_endpoint_encodes_service_name() {
        let client = RegistryClient::new("http://localhost:8000").unwrap();
        assert_eq!(client.endpoint(&[]).as_str(), "http://localhost:8000/clients");
        assert_eq!(
            client.endpoint(&["orders", "start"]).as_str(),
            "http://localhost:8000/clients/orders/start"
        );
        assert_eq!(
            client.endpoint(&["a/b c\"d", "logs"]).as_str(),
            "http://localhost:8000/clients/a%2Fb%20c%22d/logs"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = RegistryClient::new("http://host/api/").unwrap();
        assert_eq!(client.endpoint(&["x"]).as_str(), "http://host/api/clients/x");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RegistryClient::new("not a url"),
            Err(RegistryError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RegistryClient::new("mailto:ops@example.com"),
            Err(RegistryError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_clients() {
        let (client, seen) = spawn_registry().await;
        let clients = client.list_clients().await.unwrap();

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].service_name, "orders");
        assert!(clients[0].running);
        assert_eq!(clients[1].http_port, None);
        assert_eq!(seen.requests.lock().unwrap().as_slice(), ["GET /clients"]);
    }

    #[tokio::test]
    async fn test_register_posts_json() {
        let (client, seen) = spawn_registry().await;
        let registration = Registration::from_fields([
            ("serviceName", "orders"),
            ("httpPort", "8080"),
            ("securePort", "nope"),
        ]);
        client.register(&registration).await.unwrap();

        let bodies = seen.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["httpPort"], json!(8080));
        assert!(bodies[0]["securePort"].is_null());
        assert_eq!(
            bodies[0]["leaseInfo"],
            json!({"renewalIntervalInSecs": 30, "durationInSecs": 90})
        );
    }

    #[tokio::test]
    async fn test_http_error_carries_detail() {
        let (client, _) = spawn_registry().await;
        match client.start("orders").await {
            Err(RegistryError::Http { status, detail }) => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(detail.as_deref(), Some("already running"));
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }

        client.start("billing").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_without_json_body() {
        let (client, _) = spawn_registry().await;
        match client.stop("orders").await {
            Err(RegistryError::Http { status, detail }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(detail, None);
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_decodes_name_on_server() {
        let (client, seen) = spawn_registry().await;
        client.delete("my service").await.unwrap();
        assert_eq!(seen.requests.lock().unwrap().as_slice(), ["delete my service"]);
    }

    #[tokio::test]
    async fn test_stream_logs() {
        let (client, _) = spawn_registry().await;
        let stream = client.stream_logs("orders").await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        let text: Vec<u8> = chunks.concat();
        assert_eq!(text, b"line 1\nline 2\n");
    }

    #[tokio::test]
    async fn test_network_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RegistryClient::new(&format!("http://{}", addr)).unwrap();
        let err = client.delete("orders").await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {:?}", err);
    }
}
