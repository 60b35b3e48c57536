use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const VERSION: &str = "0.0.0-mock";

const QUERY_ID: HeaderName = HeaderName::from_static("x-druid-query-id");

/// Every query document the broker accepted, in arrival order.
pub type Received = Arc<RwLock<Vec<Value>>>;

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub version: &'static str,
    pub modules: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub error: &'static str,
    pub error_message: String,
}

pub fn app() -> Router {
    router(Received::default())
}

pub fn router(received: Received) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/status/health", get(health))
        .route("/druid/v2", post(run_query))
        .route("/respond/{code}", any(respond))
        .route("/bytes/{len}", get(bytes))
        .with_state(received)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Received::default()).await
}

pub async fn serve(listener: TcpListener, received: Received) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock broker listening");
    }
    axum::serve(listener, router(received)).await
}

/// Answers HEAD as well, since axum routes HEAD to GET handlers.
async fn status() -> Json<ServerStatus> {
    Json(ServerStatus {
        version: VERSION,
        modules: Vec::new(),
    })
}

async fn health() -> Json<bool> {
    Json(true)
}

async fn run_query(State(received): State<Received>, body: Bytes) -> Response {
    let query: Value = match serde_json::from_slice(&body) {
        Ok(query) => query,
        Err(e) => return bad_query(format!("body is not JSON: {e}")),
    };
    let Some(query_type) = query.get("queryType").and_then(Value::as_str).map(str::to_string) else {
        return bad_query("missing queryType".to_string());
    };
    let data_source = query.get("dataSource").cloned().unwrap_or(Value::Null);

    debug!(%query_type, "query accepted");
    received.write().await.push(query);

    let result = json!([{
        "timestamp": "2024-01-01T00:00:00.000Z",
        "result": { "queryType": query_type, "dataSource": data_source },
    }]);
    let query_id = Uuid::new_v4().to_string();
    ([(QUERY_ID, query_id)], Json(result)).into_response()
}

fn bad_query(message: String) -> Response {
    let body = QueryError {
        error: "Bad Request",
        error_message: message,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// A 200 whose body is `len` ASCII bytes.
async fn bytes(Path(len): Path<usize>) -> String {
    "x".repeat(len)
}

/// Answers any method with the status in the path. Redirect statuses point
/// back at `/status`.
async fn respond(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if status.is_redirection() {
        return (status, [(header::LOCATION, "/status")]).into_response();
    }
    status.into_response()
}
