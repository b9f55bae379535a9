//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use lensbot_agent::{
    Assistant, CompletionClient, FaqItem, KnowledgeBase, KnowledgeIndex, MythItem,
};
use lensbot_llm::{MockBackend, MockResponse};
use lensbot_server::{Server, ServerConfig};

pub const FAQ_QUESTION: &str = "Can I sleep with my lenses on?";
pub const FAQ_ANSWER: &str = "Only with lenses approved for extended wear.";
pub const MYTH: &str = "Contact lenses can get lost behind your eye.";
pub const BUST: &str = "A membrane behind the eyelid makes that impossible.";

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client for this server.
    pub client: Client,
    /// The scripted model behind the server.
    pub backend: Arc<MockBackend>,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a test server whose model always fails.
    pub async fn start() -> Result<Self> {
        Self::start_with_responses(Vec::new()).await
    }

    /// Start a test server with scripted model replies.
    pub async fn start_with_responses(responses: Vec<&str>) -> Result<Self> {
        let addr = find_available_port().await?;

        let backend = Arc::new(MockBackend::new(
            responses.into_iter().map(MockResponse::text).collect(),
        ));
        let knowledge = KnowledgeBase::new(
            vec![FaqItem {
                question: FAQ_QUESTION.into(),
                answer: FAQ_ANSWER.into(),
            }],
            vec![MythItem {
                myth: MYTH.into(),
                bust: BUST.into(),
            }],
        );
        let assistant = Assistant::new(
            CompletionClient::new(backend.clone()),
            KnowledgeIndex::exact(knowledge),
        );

        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);

        let server = Server::new(assistant, config);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            backend,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(format!("{}{}", self.base_url(), path))
    }

    /// Send one chat message and return the reply text.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<String> {
        let resp = self
            .post("/chat")
            .json(&serde_json::json!({ "session_id": session_id, "message": message }))
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "chat returned {}", resp.status());

        let body: serde_json::Value = resp.json().await?;
        body.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing 'response' field"))
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
