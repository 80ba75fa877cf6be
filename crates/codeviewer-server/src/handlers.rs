//! REST API handlers
//!
//! Domain outcomes travel in the body (`status: "success" | "fail"`); the
//! transport code only changes when the request cannot be read (400) or the
//! response cannot be produced (500). Both error codes carry the fail
//! envelope so clients parse one shape.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use codeviewer_core::{DrawRequest, DrawResponse, ViewerError};
use serde::Serialize;
use tracing::{error, warn};

use crate::ServerState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub projects: usize,
}

/// `GET /load/`: relation data of every registered project.
pub async fn load_relations(State(state): State<Arc<ServerState>>) -> Response {
    let relations = state.index.relations();
    match serde_json::to_vec(relations.as_ref()) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to serialize relations: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(DrawResponse::fail())).into_response()
        }
    }
}

/// `POST /draw/`: materialize the requested diagrams and return display text
/// and snippets.
pub async fn draw(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<DrawRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = ViewerError::RequestBind(rejection.body_text());
            warn!("{}", err);
            return (StatusCode::BAD_REQUEST, Json(DrawResponse::fail())).into_response();
        }
    };
    Json(state.materializer.draw(&request).await).into_response()
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        projects: state.materializer.registry().len(),
    })
}
