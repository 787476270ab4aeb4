//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each case names an operation and describes its input, the expected
//! request, a simulated response, and either the expected parse result or
//! the expected error variant. Requests and results are compared as parsed
//! JSON so field ordering does not matter.

use agenda_core::{
    AgendaClient, ApiError, Credentials, EventInput, HttpMethod, HttpRequest, HttpResponse,
    Registration, TaskInput,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8000/api";

fn client() -> AgendaClient {
    AgendaClient::new(BASE_URL)
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

fn input<T: serde::de::DeserializeOwned>(case: &Value) -> T {
    serde_json::from_value(case["input"].clone()).unwrap()
}

fn build(c: &AgendaClient, case: &Value) -> HttpRequest {
    let csrf = case["csrf"].as_str().unwrap_or_default();
    let id = case["input_id"].as_i64().unwrap_or_default();
    match case["operation"].as_str().unwrap() {
        "csrf_token" => c.build_csrf_token(),
        "register" => c.build_register(&input::<Registration>(case), csrf).unwrap(),
        "login" => c.build_login(&input::<Credentials>(case), csrf).unwrap(),
        "logout" => c.build_logout(csrf),
        "current_user" => c.build_current_user(),
        "list_events" => c.build_list_events(),
        "create_event" => c.build_create_event(&input::<EventInput>(case), csrf).unwrap(),
        "update_event" => c.build_update_event(id, &input::<EventInput>(case), csrf).unwrap(),
        "delete_event" => c.build_delete_event(id, csrf),
        "list_tasks" => c.build_list_tasks(),
        "create_task" => c.build_create_task(&input::<TaskInput>(case), csrf).unwrap(),
        "update_task" => c.build_update_task(id, &input::<TaskInput>(case), csrf).unwrap(),
        "delete_task" => c.build_delete_task(id, csrf),
        "chat_add_event" => c.build_chat_add_event(case["input"].as_str().unwrap(), csrf).unwrap(),
        other => panic!("unknown operation: {other}"),
    }
}

fn to_json<T: serde::Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    result.map(|v| serde_json::to_value(v).unwrap())
}

fn parse(c: &AgendaClient, case: &Value, response: HttpResponse) -> Result<Value, ApiError> {
    match case["operation"].as_str().unwrap() {
        "csrf_token" => to_json(c.parse_csrf_token(response)),
        "register" => to_json(c.parse_register(response)),
        "login" => to_json(c.parse_login(response)),
        "logout" => to_json(c.parse_logout(response)),
        "current_user" => to_json(c.parse_current_user(response)),
        "list_events" => to_json(c.parse_list_events(response)),
        "create_event" => to_json(c.parse_create_event(response)),
        "update_event" => to_json(c.parse_update_event(response)),
        "delete_event" => to_json(c.parse_delete_event(response)),
        "list_tasks" => to_json(c.parse_list_tasks(response)),
        "create_task" => to_json(c.parse_create_task(response)),
        "update_task" => to_json(c.parse_update_task(response)),
        "delete_task" => to_json(c.parse_delete_task(response)),
        "chat_add_event" => to_json(c.parse_chat_add_event(response)),
        other => panic!("unknown operation: {other}"),
    }
}

fn error_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::AuthenticationRequired => "AuthenticationRequired",
        ApiError::NotFound => "NotFound",
        ApiError::HttpError { .. } => "HttpError",
        ApiError::Transport(_) => "Transport",
        ApiError::DeserializationError(_) => "DeserializationError",
        ApiError::SerializationError(_) => "SerializationError",
        ApiError::InvalidUrl(_) => "InvalidUrl",
    }
}

fn run_vectors(raw: &str) {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let c = client();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = build(&c, case);
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.path, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: path");

        let expected_headers: Vec<(String, String)> = expected_req["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        match req.body.as_deref() {
            Some(body) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected_req["body"], "{name}: body");
            }
            None => assert!(expected_req["body"].is_null(), "{name}: body should be None"),
        }

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = parse(&c, case, response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.expect_err(name);
            assert_eq!(error_name(&err), expected_error.as_str().unwrap(), "{name}: error variant");
        } else {
            let value = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e:?}"));
            assert_eq!(value, case["expected_result"], "{name}: parsed result");
        }
    }
}

#[test]
fn auth_test_vectors() {
    run_vectors(include_str!("../../test-vectors/auth.json"));
}

#[test]
fn event_test_vectors() {
    run_vectors(include_str!("../../test-vectors/events.json"));
}

#[test]
fn task_test_vectors() {
    run_vectors(include_str!("../../test-vectors/tasks.json"));
}
