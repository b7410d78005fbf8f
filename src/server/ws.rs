use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use futures::stream::StreamExt;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::proto::ServerEvent;
use crate::server::connection::{CommandHandler, Connection};
use crate::session::SessionRegistry;

/// Shared state for the websocket gateway.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Debug, Serialize)]
struct SessionsResponse {
    active_sessions: usize,
}

/// Create the gateway router: the websocket endpoint plus health/status.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/sessions", get(session_count))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_loop(socket, state.registry))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn session_count(State(state): State<AppState>) -> impl IntoResponse {
    Json(SessionsResponse {
        active_sessions: state.registry.len().await,
    })
}

async fn websocket_loop(mut socket: WebSocket, registry: Arc<SessionRegistry>) {
    info!("WebSocket connected");
    let mut connection = Connection::new(registry);

    while let Some(result) = socket.next().await {
        match result {
            Ok(Message::Text(text)) => {
                for event in connection.handle_text(&text).await {
                    if let Err(err) = send_event(&mut socket, &event).await {
                        warn!("Failed to send event: {}", err);
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                // Audio travels base64-encoded inside JSON text frames.
                let event = ServerEvent::error("binary frames not supported");
                if let Err(err) = send_event(&mut socket, &event).await {
                    warn!("Failed to send binary warning: {}", err);
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                info!("WebSocket closed by client: {:?}", frame);
                break;
            }
            Ok(Message::Ping(payload)) => {
                if socket.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                error!("WebSocket error: {}", err);
                break;
            }
        }
    }

    // Implicit finalize-and-cleanup for any session still bound.
    connection.close().await;
    info!("WebSocket disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> anyhow::Result<()> {
    let json = serde_json::to_string(event)?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}
