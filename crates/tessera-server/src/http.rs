//! HTTP/JSON surface
//!
//! Every table-level failure is answered with `{"error": "<message>"}`:
//! not-found kinds map to 404, everything else to 400. Update bodies are
//! checked in three steps: valid JSON, known table, required fields.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, options, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tessera_core::wire::json::{
    decode_value, encode_rows, encode_schema, encode_table_list, parse_body, UpdateRequest,
};
use tessera_core::{CellError, DataStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Error response for the JSON surface
#[derive(Debug)]
pub struct ApiError(pub CellError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.0.kind().is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl From<CellError> for ApiError {
    fn from(err: CellError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Build the router over a shared store
pub fn router(store: Arc<DataStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/tables", get(list_tables).options(preflight))
        .route(
            "/api/table/{table_id}/schema",
            get(get_schema).options(preflight),
        )
        .route("/api/table/{table_id}/data", get(get_data).options(preflight))
        .route(
            "/api/table/{table_id}/update",
            post(update_cell).options(preflight),
        )
        .route("/api/{*path}", options(preflight))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn list_tables(State(store): State<Arc<DataStore>>) -> impl IntoResponse {
    Json(encode_table_list(store.list_tables()))
}

async fn get_schema(
    State(store): State<Arc<DataStore>>,
    Path(table_id): Path<String>,
) -> Result<Response, ApiError> {
    let table = store.table(&table_id)?;
    Ok(Json(encode_schema(&table)).into_response())
}

async fn get_data(
    State(store): State<Arc<DataStore>>,
    Path(table_id): Path<String>,
) -> Result<Response, ApiError> {
    let table = store.table(&table_id)?;
    Ok(Json(encode_rows(&table)).into_response())
}

async fn update_cell(
    State(store): State<Arc<DataStore>>,
    Path(table_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = parse_body(&body)?;
    // Table lookup precedes the required-field check
    drop(store.table(&table_id)?);
    let request = UpdateRequest::from_json(body)?;
    store.update_cell_with(&table_id, &request.row_id, &request.column_id, |column| {
        decode_value(&request.value, column)
    })?;
    Ok(Json(json!({ "status": "ok" })).into_response())
}
