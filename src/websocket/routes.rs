use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::directory::DirectoryError;
use crate::protocol::{ErrorCode, OrganizerToken};
use crate::quiz::QuizData;
use crate::server::{CreateRoomError, GameServer};

use super::connection::handle_socket;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<GameServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/room/create", post(create_room_handler))
        .route("/ws/{room_code}/{client_id}", get(websocket_handler))
        .route("/health", get(health_check))
        .layer(
            tower::ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Body of `POST /room/create`. The quiz arrives pre-generated from the
/// upstream quiz producer; the core only validates and hosts it.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub quiz: QuizData,
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_code: String,
    pub organizer_token: OrganizerToken,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    error_code: ErrorCode,
}

async fn create_room_handler(
    State(server): State<Arc<GameServer>>,
    Json(request): Json<CreateRoomRequest>,
) -> Response {
    match server.create_room(request.quiz, request.time_limit_seconds) {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreateRoomResponse {
                room_code: created.room_code,
                organizer_token: created.organizer_token,
            }),
        )
            .into_response(),
        Err(err) => {
            let (status, error_code) = match &err {
                CreateRoomError::InvalidQuiz(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidQuiz),
                CreateRoomError::InvalidTimeLimit => {
                    (StatusCode::BAD_REQUEST, ErrorCode::InvalidCommand)
                }
                CreateRoomError::Directory(DirectoryError::MaxRoomsReached { .. }) => {
                    (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::MaxRoomsReached)
                }
                CreateRoomError::Directory(DirectoryError::CodeSpaceExhausted) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
                }
            };
            (
                status,
                Json(ApiError {
                    error: err.to_string(),
                    error_code,
                }),
            )
                .into_response()
        }
    }
}

/// Role selection for one realtime connection, from the URL query.
#[derive(Debug, Clone, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub organizer: bool,
    #[serde(default)]
    pub spectator: bool,
    #[serde(default)]
    pub token: Option<OrganizerToken>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path((room_code, client_id)): Path<(String, String)>,
    Query(params): Query<WsParams>,
    State(server): State<Arc<GameServer>>,
) -> Response {
    // The room may vanish between lookup and upgrade; the adapter
    // re-checks by delivering a typed error on a dead handle.
    let room = server.lookup_room(&room_code);
    ws.on_upgrade(move |socket| {
        handle_socket(socket, server, room, room_code, client_id, params)
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    rooms: usize,
}

/// Health check endpoint
async fn health_check(State(server): State<Arc<GameServer>>) -> Response {
    if server.health_check() {
        Json(HealthResponse {
            status: "ok",
            rooms: server.room_count(),
        })
        .into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}
