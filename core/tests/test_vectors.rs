//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error kinds. Request bodies are compared as
//! parsed JSON; canonical encodings in `serialize.json` are compared byte for
//! byte.

use intheam_core::{
    to_json, ApiError, HttpMethod, HttpRequest, HttpResponse, InTheAmClient, JsonOptions,
    Schemed, Task,
};
use serde_json::Value;
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:3000/api/v1";

fn client() -> InTheAmClient {
    InTheAmClient::new(BASE_URL, "secret")
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_error_kind(name: &str, err: &ApiError, expected: &str) {
    let matched = match expected {
        "NotAuthenticated" => matches!(err, ApiError::NotAuthenticated { .. }),
        "NotFound" => matches!(err, ApiError::NotFound { .. }),
        "Http" => matches!(err, ApiError::Http { .. }),
        "Deserialization" => matches!(err, ApiError::Deserialization(_)),
        "Validation" => matches!(err, ApiError::Validation(_)),
        other => panic!("{name}: unknown expected_error: {other}"),
    };
    assert!(matched, "{name}: expected {expected}, got {err:?}");
}

fn summary(task: &Task) -> Value {
    serde_json::json!({
        "id": task.id.to_string(),
        "description": task.description,
        "status": task.status.map(|s| s.as_str()),
    })
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let raw = include_str!("../../test-vectors/list.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let req = match case["endpoint"].as_str().unwrap() {
            "pending" => c.build_pending(),
            "completed" => c.build_completed(),
            other => panic!("{name}: unknown endpoint: {other}"),
        };
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_task_list(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_error_kind(name, &result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            let tasks: Vec<Value> = result.unwrap().iter().map(summary).collect();
            assert_eq!(Value::from(tasks), case["expected_result"], "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[test]
fn get_test_vectors() {
    let raw = include_str!("../../test-vectors/get.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id: Uuid = case["input_id"].as_str().unwrap().parse().unwrap();

        let req = c.build_get_task(id);
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_task(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_error_kind(name, &result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            let task = result.unwrap();
            assert_eq!(summary(&task), case["expected_result"], "{name}: parsed result");
            assert_eq!(task.remote_id(), id, "{name}: remote id");
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[test]
fn action_test_vectors() {
    let raw = include_str!("../../test-vectors/actions.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let task = Task::validate(case["task"].clone()).unwrap();

        let req = match case["action"].as_str().unwrap() {
            "save" => c.build_save_task(&task).unwrap(),
            "start" => c.build_start_task(&task),
            "stop" => c.build_stop_task(&task),
            "delete" => c.build_delete_task(&task),
            "complete" => c.build_complete_task(&task),
            other => panic!("{name}: unknown action: {other}"),
        };
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_ack(simulated_response(case));
        match case.get("expected_error") {
            Some(expected_error) => {
                assert_error_kind(name, &result.unwrap_err(), expected_error.as_str().unwrap())
            }
            None => assert!(result.is_ok(), "{name}: expected success"),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialize
// ---------------------------------------------------------------------------

#[test]
fn serialize_test_vectors() {
    let raw = include_str!("../../test-vectors/serialize.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let task = Task::validate(case["input"].clone()).unwrap();
        let options = JsonOptions {
            sort_keys: case["sort_keys"].as_bool().unwrap(),
            indent: None,
        };
        let encoded = to_json(&task, options).unwrap();
        assert_eq!(encoded, case["expected"].as_str().unwrap(), "{name}: encoding");
    }
}
