//! HTTP transport server using Axum.
//!
//! Every inbound request is read to completion, converted into an
//! [`HttpMessage`] and handed to the [`RequestHandler`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request as AxumRequest, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use rq_http::{Abort, HttpMessage, Method, Response, Status};
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::config::ServerConfig;

/// Trait implemented by the application to handle incoming messages.
/// The transport layer calls this for every request it reads.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, http: HttpMessage) -> impl std::future::Future<Output = Response> + Send;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid listen address {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared state for the transport server.
struct AppState<H: RequestHandler> {
    handler: Arc<H>,
    config: ServerConfig,
}

/// The running HTTP server.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl TransportServer {
    /// Bind and start serving `handler` in a background task.
    pub async fn start<H: RequestHandler>(
        config: ServerConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let enable_cors = config.enable_cors;
        let state = Arc::new(AppState { handler, config });

        let mut app = Router::new().fallback(dispatch::<H>).with_state(state);
        if enable_cors {
            app = app.layer(CorsLayer::permissive());
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Listening on http://{}:{}", addr.ip(), actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Transport server stopped");
    }
}

async fn dispatch<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
    request: AxumRequest,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.config.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            debug!("Rejected request body: {e}");
            let abort = Abort::new(Status::PayloadTooLarge, format!("Failed to read body: {e}"));
            return into_axum(Response::from(abort));
        }
    };

    let response = state.handler.handle(to_message(parts, body)).await;
    into_axum(response)
}

fn to_message(parts: Parts, body: axum::body::Bytes) -> HttpMessage {
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut message = HttpMessage::new(Method::parse(parts.method.as_str()), target);
    message.version = format!("{:?}", parts.version);
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => message.append_header(name.as_str(), value),
            Err(_) => debug!("Dropped non-ASCII header {name}"),
        }
    }
    message.set_body(body);
    message
}

fn into_axum(response: Response) -> axum::response::Response {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|e| {
            error!("Failed to build response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
