//! Stateless HTTP request builder and response parser for the inthe.am API.
//!
//! # Design
//! `InTheAmClient` holds only the base URL and the API key and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The caller (or a `Session`) executes the actual HTTP
//! round-trip in between.
//!
//! Resource URLs use the task's `uuid` field when the server sent one and
//! fall back to `id`; see `Task::remote_id`.

use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema::{Datum, Schemed};
use crate::serialize::{to_json, JsonOptions};
use crate::types::Task;

/// Synchronous, stateless client for the inthe.am API.
#[derive(Debug, Clone)]
pub struct InTheAmClient {
    base_url: String,
    api_key: String,
}

impl InTheAmClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, &config.api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![("Authorization".to_string(), format!("ApiKey {}", self.api_key))],
            body: None,
        }
    }

    fn task_path(task_id: Uuid) -> String {
        format!("/task/{task_id}/")
    }

    pub fn build_pending(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/task/")
    }

    pub fn build_completed(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/completedtask/")
    }

    pub fn build_user_status(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/user/status/")
    }

    pub fn build_get_task(&self, task_id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &Self::task_path(task_id))
    }

    pub fn build_save_task(&self, task: &Task) -> Result<HttpRequest, ApiError> {
        let body = to_json(task, JsonOptions::default()).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(HttpMethod::Put, &Self::task_path(task.remote_id()));
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    pub fn build_start_task(&self, task: &Task) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/task/{}/start/", task.remote_id()))
    }

    pub fn build_stop_task(&self, task: &Task) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/task/{}/stop/", task.remote_id()))
    }

    pub fn build_delete_task(&self, task: &Task) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/task/{}/delete/", task.remote_id()))
    }

    pub fn build_complete_task(&self, task: &Task) -> HttpRequest {
        self.request(HttpMethod::Delete, &Self::task_path(task.remote_id()))
    }

    /// Tasks in the `objects` array of a listing; a missing array is empty.
    pub fn parse_task_list(&self, response: HttpResponse) -> Result<Vec<Task>, ApiError> {
        let mut body = parse_json(response)?;
        let objects = match body.get_mut("objects").map(Value::take) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::Deserialization(format!(
                    "expected `objects` to be an array, found {other}"
                )))
            }
        };
        objects
            .into_iter()
            .map(|item| Task::validate(item).map_err(ApiError::from))
            .collect()
    }

    pub fn parse_user_status(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    pub fn parse_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        Ok(Task::validate(parse_json(response)?)?)
    }

    /// Raw task document, for refreshing an existing snapshot with `update`.
    pub fn parse_task_data(&self, response: HttpResponse) -> Result<Datum, ApiError> {
        parse_json(response).map(Datum::from)
    }

    /// Acknowledgement of a mutating call; the body is ignored.
    pub fn parse_ack(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        _ if response.is_success() => Ok(()),
        401 | 403 => Err(ApiError::NotAuthenticated {
            status: response.status,
            body: response.body.clone(),
        }),
        404 => Err(ApiError::NotFound {
            body: response.body.clone(),
        }),
        status => Err(ApiError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}

fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
