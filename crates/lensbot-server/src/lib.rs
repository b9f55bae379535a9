//! HTTP API server for the lensbot assistant.
//!
//! # Routes
//!
//! - `POST /chat`: one conversational turn, always 200
//! - `GET /health`: liveness
//! - `GET /sessions`, `GET /sessions/{id}`, `DELETE /sessions/{id}`: session lifecycle
//! - `/static/*`: optional asset directory
//!
//! # Example
//!
//! ```ignore
//! use lensbot_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:8000".parse()?);
//! let server = Server::new(assistant, config);
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use routes::{ChatRequest, ChatResponse, HealthResponse};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware};
use lensbot_agent::Assistant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The lensbot HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with a default session store.
    pub fn new(assistant: Assistant, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(assistant, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::{get, post};

        let mut router = Router::new()
            .merge(routes::health_routes())
            .route("/chat", post(routes::chat_handler))
            .route("/sessions", get(routes::list_sessions_handler))
            .route(
                "/sessions/{id}",
                get(routes::get_session_handler).delete(routes::delete_session_handler),
            );

        if let Some(dir) = &self.state.config.static_dir {
            if dir.is_dir() {
                info!(dir = %dir.display(), "Serving static files at /static");
                router = router.nest_service("/static", ServeDir::new(dir));
            } else {
                warn!(dir = %dir.display(), "Static directory not found, /static disabled");
            }
        }

        router
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Listening on http://{}", addr);

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use lensbot_agent::{CompletionClient, KnowledgeBase, KnowledgeIndex};
    use lensbot_llm::MockBackend;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_assistant() -> Assistant {
        Assistant::new(
            CompletionClient::new(Arc::new(MockBackend::with_text("Test response"))),
            KnowledgeIndex::exact(KnowledgeBase::default()),
        )
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let server = Server::new(create_test_assistant(), ServerConfig::new());

        let (status, _) = get(server.router(), "/health").await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_files_served() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Lens4U</h1>").unwrap();
        let config = ServerConfig::new().with_static_dir(Some(dir.path().to_path_buf()));
        let server = Server::new(create_test_assistant(), config);

        let (status, body) = get(server.router(), "/static/index.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Lens4U</h1>");

        let (status, body) = get(server.router(), "/static/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Lens4U</h1>");
    }

    #[tokio::test]
    async fn test_missing_static_dir_is_skipped() {
        let config = ServerConfig::new().with_static_dir(Some("/definitely/not/here".into()));
        let server = Server::new(create_test_assistant(), config);

        let (status, _) = get(server.router(), "/static/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig::new().with_bind_address("0.0.0.0:9000".parse().unwrap());
        let server = Server::new(create_test_assistant(), config);
        assert_eq!(server.bind_address().port(), 9000);
    }
}
