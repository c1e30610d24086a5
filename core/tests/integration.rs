//! Task lifecycle test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `Session`
//! operation over real HTTP with `UreqTransport`. Validates that request
//! building, the transport and response parsing agree with the server.

use std::net::SocketAddr;

use intheam_core::{ApiError, ClientConfig, Schemed, Session, Status, Task};
use serde_json::json;
use uuid::Uuid;

const KEY: &str = "integration-key";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, KEY).await
        })
        .unwrap();
    });
    addr
}

fn config(addr: SocketAddr, key: &str) -> ClientConfig {
    ClientConfig::new(key).with_base_url(format!("http://{addr}/api/v1"))
}

fn local_task(id: Uuid, description: &str, short_id: i64) -> Task {
    Task::validate(json!({
        "description": description,
        "status": "pending",
        "priority": "M",
        "id": id.to_string(),
        "annotations": [
            {"description": "first note", "entry": "Mon, 22 Jun 2015 22:26:00 +0100"},
        ],
        "blocks": [],
        "depends": [],
        "due": null,
        "entry": "Mon, 22 Jun 2015 22:26:00 +0100",
        "modified": "Mon, 22 Jun 2015 22:26:00 +0100",
        "progress": null,
        "project": "integration",
        "scheduled": null,
        "start": null,
        "short_id": short_id,
        "urgency": 1.5,
        "tags": ["rust"],
        "imask": null,
        "wait": null,
    }))
    .unwrap()
}

#[test]
fn task_lifecycle() {
    let addr = start_server();
    let session = Session::from_config(&config(addr, KEY));

    // Step 1: nothing pending yet.
    assert!(session.pending().unwrap().is_empty(), "expected empty list");

    // Step 2: save a locally built task.
    let id = Uuid::new_v4();
    let draft = local_task(id, "Integration test", 1);
    assert!(!draft.is_attached());
    let saved = session.save_task(&draft).unwrap();
    assert!(saved.is_attached());
    assert_eq!(saved.description, "Integration test");
    assert_eq!(saved.annotations, draft.annotations);
    assert!(saved.modified > draft.modified, "server stamps modified");

    // Step 3: it shows up in the pending listing.
    let pending = session.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].tags, ["rust"]);

    // Step 4: start and stop through the task itself.
    let started = saved.mark_started().unwrap();
    assert!(started.start.is_some());
    let stopped = started.mark_stopped().unwrap();
    assert!(stopped.start.is_none());

    // Step 5: local edit, saved and fetched back.
    let renamed = stopped.update(json!({"description": "Renamed"})).unwrap();
    session.save_task(&renamed).unwrap();
    let fetched = session.task(id).unwrap();
    assert_eq!(fetched.description, "Renamed");
    assert_eq!(fetched.project.as_deref(), Some("integration"));

    // Step 6: complete it.
    let completed = session.complete_task(&fetched).unwrap();
    assert_eq!(completed.status, Some(Status::Completed));
    assert!(session.pending().unwrap().is_empty());
    let done = session.completed().unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, id);

    // Step 7: a second task, deleted.
    let other = session
        .save_task(&local_task(Uuid::new_v4(), "Throwaway", 2))
        .unwrap();
    let deleted = other.delete().unwrap();
    assert_eq!(deleted.status, Some(Status::Deleted));

    // Step 8: the account sees both.
    let status = session.user_status().unwrap();
    assert_eq!(status["task_count"], 2);

    // Step 9: unknown task.
    let err = session.task(Uuid::nil()).unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }), "expected NotFound, got {err:?}");
}

#[test]
fn wrong_key_is_not_authenticated() {
    let addr = start_server();
    let session = Session::from_config(&config(addr, "wrong-key"));

    let err = session.pending().unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated { status: 401, .. }));
    assert_eq!(err.status(), Some(401));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = Session::from_config(&config(addr, KEY));
    assert!(matches!(session.user_status(), Err(ApiError::Transport(_))));
}
