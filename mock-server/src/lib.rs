//! In-memory imitation of the inthe.am v1 task API.
//!
//! Tasks are stored as raw JSON documents keyed by id. Every route requires
//! `Authorization: ApiKey <key>`. Timestamps written by the server use the
//! same RFC 2822 style as the real service.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";

const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

pub type Db = Arc<RwLock<HashMap<Uuid, Value>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    api_key: Arc<str>,
}

pub fn app(api_key: &str) -> Router {
    app_with_db(api_key, Db::default())
}

/// Router over an existing store, so tests can seed or inspect it.
pub fn app_with_db(api_key: &str, db: Db) -> Router {
    let state = AppState {
        db,
        api_key: Arc::from(api_key),
    };
    let api = Router::new()
        .route("/task/", get(list_pending))
        .route("/completedtask/", get(list_completed))
        .route("/user/status/", get(user_status))
        .route(
            "/task/{id}/",
            get(get_task).put(save_task).delete(complete_task),
        )
        .route("/task/{id}/start/", post(start_task))
        .route("/task/{id}/stop/", post(stop_task))
        .route("/task/{id}/delete/", post(delete_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock inthe.am listening");
    }
    axum::serve(listener, app(api_key)).await
}

fn now() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("ApiKey {}", state.api_key);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid or missing API key").into_response();
    }
    next.run(request).await
}

fn status_of(task: &Value) -> Option<&str> {
    task.get("status").and_then(Value::as_str)
}

async fn listing(db: &Db, keep: impl Fn(Option<&str>) -> bool) -> Json<Value> {
    let tasks = db.read().await;
    let mut objects: Vec<Value> = tasks
        .values()
        .filter(|t| keep(status_of(t)))
        .cloned()
        .collect();
    objects.sort_by_key(|t| t.get("short_id").and_then(Value::as_i64).unwrap_or(i64::MAX));
    Json(json!({
        "meta": {"total_count": objects.len()},
        "objects": objects,
    }))
}

async fn list_pending(State(state): State<AppState>) -> Json<Value> {
    listing(&state.db, |s| matches!(s, Some("pending" | "waiting"))).await
}

async fn list_completed(State(state): State<AppState>) -> Json<Value> {
    listing(&state.db, |s| s == Some("completed")).await
}

async fn user_status(State(state): State<AppState>) -> Json<Value> {
    let count = state.db.read().await.len();
    Json(json!({
        "logged_in": true,
        "username": "mock",
        "task_count": count,
    }))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    let tasks = state.db.read().await;
    tasks.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Creates the task when `id` is new, otherwise overlays the sent fields.
async fn save_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<Map<String, Value>>,
) -> Json<Value> {
    let mut tasks = state.db.write().await;
    let entry = tasks
        .entry(id)
        .or_insert_with(|| json!({"id": id.to_string()}));
    if let Some(stored) = entry.as_object_mut() {
        stored.extend(input);
        stored.insert("modified".into(), Value::String(now()));
    }
    info!(%id, "task saved");
    Json(entry.clone())
}

async fn modify(
    db: &Db,
    id: Uuid,
    change: impl FnOnce(&mut Map<String, Value>),
) -> Result<Json<Value>, StatusCode> {
    let mut tasks = db.write().await;
    let task = tasks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(stored) = task.as_object_mut() {
        change(stored);
        stored.insert("modified".into(), Value::String(now()));
    }
    Ok(Json(task.clone()))
}

async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    info!(%id, "task started");
    modify(&state.db, id, |t| {
        t.insert("start".into(), Value::String(now()));
    })
    .await
}

async fn stop_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    info!(%id, "task stopped");
    modify(&state.db, id, |t| {
        t.insert("start".into(), Value::Null);
    })
    .await
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    info!(%id, "task deleted");
    modify(&state.db, id, |t| {
        t.insert("status".into(), json!("deleted"));
    })
    .await
}

async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    info!(%id, "task completed");
    modify(&state.db, id, |t| {
        t.insert("status".into(), json!("completed"));
    })
    .await
}
