//! Request/response round-trips against a live API.
//!
//! A `Session` pairs the stateless `InTheAmClient` with a `Transport`. Tasks
//! it returns hold a weak link back to it, so `Task::mark_started` and
//! friends work for as long as the session is alive. Every mutating call
//! re-fetches the task and folds the server's copy into the snapshot with
//! `Schemed::update`.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::InTheAmClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::schema::Schemed;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Task, TaskOps};

pub struct Session<T> {
    client: InTheAmClient,
    transport: T,
    this: Weak<Session<T>>,
}

impl Session<UreqTransport> {
    /// Session over `ureq` using `config`'s URL, key and timeout.
    pub fn from_config(config: &ClientConfig) -> Arc<Self> {
        Self::new(
            InTheAmClient::from_config(config),
            UreqTransport::new(config.timeout()),
        )
    }
}

impl<T: Transport + 'static> Session<T> {
    pub fn new(client: InTheAmClient, transport: T) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            client,
            transport,
            this: this.clone(),
        })
    }

    pub fn client(&self) -> &InTheAmClient {
        &self.client
    }

    fn handle(&self) -> Weak<dyn TaskOps> {
        self.this.clone()
    }

    fn attach(&self, task: Task) -> Task {
        task.with_api(self.handle())
    }

    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    fn logged<R>(result: Result<R, ApiError>, operation: &'static str) -> Result<R, ApiError> {
        result.inspect_err(|err| warn!(operation, error = %err, "inthe.am request failed"))
    }

    pub fn pending(&self) -> Result<Vec<Task>, ApiError> {
        let result = self
            .round_trip(self.client.build_pending())
            .and_then(|resp| self.client.parse_task_list(resp));
        let tasks = Self::logged(result, "pending")?;
        Ok(tasks.into_iter().map(|t| self.attach(t)).collect())
    }

    pub fn completed(&self) -> Result<Vec<Task>, ApiError> {
        let result = self
            .round_trip(self.client.build_completed())
            .and_then(|resp| self.client.parse_task_list(resp));
        let tasks = Self::logged(result, "completed")?;
        Ok(tasks.into_iter().map(|t| self.attach(t)).collect())
    }

    pub fn user_status(&self) -> Result<Value, ApiError> {
        let result = self
            .round_trip(self.client.build_user_status())
            .and_then(|resp| self.client.parse_user_status(resp));
        Self::logged(result, "user_status")
    }

    pub fn task(&self, task_id: Uuid) -> Result<Task, ApiError> {
        let result = self
            .round_trip(self.client.build_get_task(task_id))
            .and_then(|resp| self.client.parse_task(resp));
        Self::logged(result, "task").map(|t| self.attach(t))
    }

    /// The server's current copy of `task`, merged over the local snapshot.
    pub fn refresh_task(&self, task: &Task) -> Result<Task, ApiError> {
        let result = self
            .round_trip(self.client.build_get_task(task.remote_id()))
            .and_then(|resp| self.client.parse_task_data(resp))
            .and_then(|data| Ok(task.update(data)?));
        Self::logged(result, "refresh_task").map(|t| self.attach(t))
    }

    pub fn save_task(&self, task: &Task) -> Result<Task, ApiError> {
        let request = self.client.build_save_task(task)?;
        self.mutate(request, task, "save_task")
    }

    pub fn start_task(&self, task: &Task) -> Result<Task, ApiError> {
        self.mutate(self.client.build_start_task(task), task, "start_task")
    }

    pub fn stop_task(&self, task: &Task) -> Result<Task, ApiError> {
        self.mutate(self.client.build_stop_task(task), task, "stop_task")
    }

    pub fn delete_task(&self, task: &Task) -> Result<Task, ApiError> {
        self.mutate(self.client.build_delete_task(task), task, "delete_task")
    }

    pub fn complete_task(&self, task: &Task) -> Result<Task, ApiError> {
        self.mutate(self.client.build_complete_task(task), task, "complete_task")
    }

    fn mutate(&self, request: HttpRequest, task: &Task, operation: &'static str) -> Result<Task, ApiError> {
        let result = self
            .round_trip(request)
            .and_then(|resp| self.client.parse_ack(resp));
        Self::logged(result, operation)?;
        self.refresh_task(task)
    }
}

impl<T: Transport + 'static> TaskOps for Session<T> {
    fn refresh_task(&self, task: &Task) -> Result<Task, ApiError> {
        Session::refresh_task(self, task)
    }

    fn start_task(&self, task: &Task) -> Result<Task, ApiError> {
        Session::start_task(self, task)
    }

    fn stop_task(&self, task: &Task) -> Result<Task, ApiError> {
        Session::stop_task(self, task)
    }

    fn delete_task(&self, task: &Task) -> Result<Task, ApiError> {
        Session::delete_task(self, task)
    }
}
