//! HTTP API for the stock take UI
//!
//! Thin layer over [`crate::engine`]: parses JSON, locks the shared connection,
//! and maps engine errors to status codes with an `{"error": ...}` body.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

use crate::engine::{self, NewItemPolicy, ScanOutcome};
use crate::error::StockError;
use crate::export::items_to_csv;
use crate::models::{Item, ScanRequest};

/// Shared application state (thread-safe database connection + creation policy)
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    policy: NewItemPolicy,
}

impl AppState {
    pub fn new(db: Arc<Mutex<Connection>>, policy: NewItemPolicy) -> Self {
        Self { db, policy }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StockError> {
        self.db
            .lock()
            .map_err(|_| StockError::Internal("database connection unavailable".to_string()))
    }
}

/// Error body returned for every failed request
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Body returned by DELETE
#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

impl StockError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            StockError::MissingBarcode
            | StockError::MissingRequiredField(_)
            | StockError::InvalidField(_)
            | StockError::InvalidQty(_)
            | StockError::NoFieldsToUpdate
            | StockError::BadRequest(_) => StatusCode::BAD_REQUEST,
            StockError::NotFound(_) => StatusCode::NOT_FOUND,
            StockError::Conflict(_) => StatusCode::CONFLICT,
            StockError::Internal(_) | StockError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StockError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<JsonRejection> for StockError {
    fn from(rejection: JsonRejection) -> Self {
        StockError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for StockError {
    fn from(rejection: PathRejection) -> Self {
        StockError::BadRequest(rejection.body_text())
    }
}

/// POST /scan
async fn scan_handler(
    State(state): State<AppState>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<Item>, StockError> {
    let Json(request) = body?;
    let mut conn = state.conn()?;

    let outcome = engine::scan(&mut conn, &request, state.policy)?;
    if let ScanOutcome::Created(item) = &outcome {
        log::info!("New barcode scanned: {}", item.barcode);
    }
    Ok(Json(outcome.into_item()))
}

/// GET /items
async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<Item>>, StockError> {
    let conn = state.conn()?;
    Ok(Json(engine::list(&conn)?))
}

/// PUT /items/{id}
async fn update_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Item>, StockError> {
    let Path(id) = id?;
    let Json(fields) = body?;
    let conn = state.conn()?;
    Ok(Json(engine::update(&conn, id, &fields)?))
}

/// DELETE /items/{id}
async fn delete_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, StockError> {
    let Path(id) = id?;
    let conn = state.conn()?;
    engine::delete(&conn, id)?;
    Ok(Json(DeleteResponse { success: true }))
}

/// GET /items.csv
async fn export_handler(State(state): State<AppState>) -> Result<Response, StockError> {
    let items = {
        let conn = state.conn()?;
        engine::list(&conn)?
    };
    let csv = items_to_csv(&items)
        .map_err(|e| StockError::Internal(format!("CSV export failed: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"stock.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// Build the web server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/scan", post(scan_handler))
        .route("/items", get(list_handler))
        .route("/items.csv", get(export_handler))
        .route("/items/{id}", put(update_handler).delete(delete_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server (async), stopping cleanly on Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    log::info!("Stock take API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
