//! Test helper utilities for integration tests

use crate::fixtures::{chat_endpoint, new_model, new_provider};
use gateway_config::ServerConfig;
use gateway_core::{InMemoryProviderRepository, ProviderAdmin, ProviderId, ProviderRepository};
use gateway_providers::{HttpTransport, HttpTransportConfig, ProviderGateway};
use gateway_server::{AppState, Server};
use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Gateway, admin service and repository wired to the real HTTP transport
pub struct TestGateway {
    /// Dispatch orchestrator
    pub gateway: ProviderGateway,
    /// Administration over the same repository
    pub admin: ProviderAdmin,
}

impl TestGateway {
    /// Build with a short request timeout
    pub fn new() -> Self {
        init_tracing();
        let repository: Arc<dyn ProviderRepository> = Arc::new(InMemoryProviderRepository::new());
        let transport = HttpTransport::new(
            HttpTransportConfig::default().with_request_timeout(Duration::from_secs(5)),
        )
        .expect("http transport");
        Self {
            gateway: ProviderGateway::new(Arc::clone(&repository), Arc::new(transport)),
            admin: ProviderAdmin::new(repository),
        }
    }

    /// Register a provider at `base_url` with one model and the chat endpoint
    pub async fn register(
        &self,
        base_url: &str,
        request_template: &str,
        response_template: &str,
        streaming: bool,
    ) -> ProviderId {
        let provider = self
            .admin
            .create_provider(new_provider(base_url, request_template, response_template))
            .await
            .expect("create provider");
        self.admin
            .add_models(provider.id(), vec![new_model("large", streaming)])
            .await
            .expect("add model");
        self.admin
            .add_endpoints(provider.id(), vec![chat_endpoint()])
            .await
            .expect("add endpoint");
        provider.id()
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Test server wrapper for integration tests
pub struct TestServer {
    /// The server address
    pub addr: SocketAddr,
    /// HTTP client for making requests
    pub client: Client,
    /// Base URL for the server
    pub base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start the full gateway server on an ephemeral port
    pub async fn start() -> Self {
        init_tracing();
        let state = AppState::builder()
            .transport_config(
                HttpTransportConfig::default().with_request_timeout(Duration::from_secs(5)),
            )
            .build()
            .expect("app state");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::new(ServerConfig::default(), state);
        tokio::spawn(server.serve(listener, async move {
            let _ = shutdown_rx.await;
        }));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create client");

        Self {
            addr,
            client,
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Create a provider through the admin API with model `large` and the chat endpoint
    pub async fn register_provider(&self, body: &Value, streaming: bool) -> String {
        let created = self.post_json("/admin/providers", body).await;
        assert_status(&created, 201);
        let id = Self::json_body(created).await["id"]
            .as_str()
            .expect("provider id")
            .to_string();

        let models = serde_json::json!([{
            "name": "Large",
            "key": "large",
            "capabilities": { "streaming": streaming }
        }]);
        assert_status(
            &self.post_json(&format!("/admin/providers/{id}/models"), &models).await,
            201,
        );

        let endpoints = serde_json::json!([{ "name": "chat", "path": "/v1/chat/completions" }]);
        assert_status(
            &self
                .post_json(&format!("/admin/providers/{id}/endpoints"), &endpoints)
                .await,
            201,
        );
        id
    }

    /// Parse response body as JSON
    pub async fn json_body(response: Response) -> Value {
        response.json().await.expect("Failed to parse JSON")
    }

    /// Shutdown the test server
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Assert response status
pub fn assert_status(response: &Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "Expected status {expected}, got {}",
        response.status()
    );
}

/// `data:` payloads of a server-sent event body, in order
pub fn sse_data(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.trim_start().to_string())
        .collect()
}

/// An upstream that opens an event stream, sends `first_frame`, and then
/// never sends anything else.
///
/// The returned receiver fires once the client side closes the connection.
pub async fn hanging_stream_upstream(first_frame: String) -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let (released_tx, released_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buffer = vec![0_u8; 16 * 1024];
        if socket.read(&mut buffer).await.unwrap_or(0) == 0 {
            return;
        }

        let frame = format!("data: {first_frame}\n\n");
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n{:x}\r\n{frame}\r\n",
            frame.len()
        );
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }

        // Drain until the peer hangs up.
        loop {
            match socket.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = released_tx.send(());
    });

    (format!("http://{addr}"), released_rx)
}
