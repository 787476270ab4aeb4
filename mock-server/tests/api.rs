use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app_with_state, AppState, Event, Task, User};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Build a request. `session` adds the session cookie; mutating methods
/// always carry the CSRF cookie and header.
fn request(method: &str, uri: &str, session: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut cookie = format!("csrftoken={TOKEN}");
    if let Some(session) = session {
        cookie.push_str(&format!("; sessionid={session}"));
    }
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::COOKIE, cookie);
    if method != "GET" {
        builder = builder.header("X-CSRFToken", TOKEN);
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

fn set_cookie(response: &axum::response::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn app() -> (Router, AppState) {
    let state = AppState::with_csrf_token(TOKEN);
    (app_with_state(state.clone()), state)
}

/// Register `ada` and log in, returning the session id.
async fn signed_in(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register/",
            None,
            Some(r#"{"username":"ada","password":"pw","email":"ada@example.com"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login/",
            None,
            Some(r#"{"username":"ada","password":"pw"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    set_cookie(&resp, "sessionid").expect("login sets a session cookie")
}

// --- token ---

#[tokio::test]
async fn csrf_token_endpoint_sets_cookie() {
    let (app, state) = app();
    let resp = app
        .oneshot(Request::builder().uri("/api/csrf-token/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(set_cookie(&resp, "csrftoken").as_deref(), Some(TOKEN));
    assert_eq!(state.hits("/api/csrf-token/"), 1);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "CSRF cookie set");
}

#[tokio::test]
async fn login_without_token_is_forbidden() {
    let (app, _) = app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login/")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"username":"ada","password":"pw"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().starts_with("CSRF Failed"));
}

// --- auth ---

#[tokio::test]
async fn current_user_requires_session() {
    let (app, _) = app();
    let resp = app
        .oneshot(request("GET", "/api/auth/user/", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn current_user_after_login() {
    let (app, _) = app();
    let session = signed_in(&app).await;
    let resp = app
        .oneshot(request("GET", "/api/auth/user/", Some(&session), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(user.username, "ada");
    assert_eq!(user.email, "ada@example.com");
}

#[tokio::test]
async fn duplicate_registration_returns_400() {
    let (app, _) = app();
    signed_in(&app).await;
    let resp = app
        .oneshot(request(
            "POST",
            "/api/auth/register/",
            None,
            Some(r#"{"username":"ada","password":"other"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert!(body["username"].is_array());
}

#[tokio::test]
async fn bad_password_returns_401() {
    let (app, _) = app();
    signed_in(&app).await;
    let resp = app
        .oneshot(request(
            "POST",
            "/api/auth/login/",
            None,
            Some(r#"{"username":"ada","password":"wrong"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Invalid credentials");
}

#[tokio::test]
async fn logout_ends_session() {
    let (app, _) = app();
    let session = signed_in(&app).await;

    let resp = app
        .clone()
        .oneshot(request("POST", "/api/auth/logout/", Some(&session), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", "/api/events/", Some(&session), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// --- events ---

#[tokio::test]
async fn create_event_malformed_json_returns_400() {
    let (app, _) = app();
    let session = signed_in(&app).await;
    let resp = app
        .oneshot(request("POST", "/api/events/", Some(&session), Some(r#"{"title":1}"#)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_event_rejects_unknown_category() {
    let (app, _) = app();
    let session = signed_in(&app).await;
    let resp = app
        .oneshot(request(
            "POST",
            "/api/events/",
            Some(&session),
            Some(r#"{"title":"x","date":"2025-01-02","start_time":"08:00","end_time":"09:00","category":"party"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutating_with_session_but_wrong_token_is_forbidden() {
    let (app, _) = app();
    let session = signed_in(&app).await;
    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/events/1/")
                .header(http::header::COOKIE, format!("csrftoken={TOKEN}; sessionid={session}"))
                .header("X-CSRFToken", "stale")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn event_lifecycle() {
    let (app, _) = app();
    let session = signed_in(&app).await;

    // create
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/events/",
            Some(&session),
            Some(r#"{"title":"Review","date":"2025-04-01","start_time":"10:00","end_time":"11:00","category":"meeting"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Event = body_json(resp).await;
    assert_eq!(created.category, "meeting");
    assert!(!created.completed);
    let id = created.id;

    // list
    let resp = app
        .clone()
        .oneshot(request("GET", "/api/events/", Some(&session), None))
        .await
        .unwrap();
    let events: Vec<Event> = body_json(resp).await;
    assert_eq!(events, vec![created.clone()]);

    // update
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/events/{id}/"),
            Some(&session),
            Some(r#"{"title":"Review","date":"2025-04-01","start_time":"10:00","end_time":"11:30","category":"meeting","completed":true}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Event = body_json(resp).await;
    assert_eq!(updated.end_time, "11:30");
    assert!(updated.completed);

    // delete
    let resp = app
        .clone()
        .oneshot(request("DELETE", &format!("/api/events/{id}/"), Some(&session), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // delete again
    let resp = app
        .oneshot(request("DELETE", &format!("/api/events/{id}/"), Some(&session), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- tasks ---

#[tokio::test]
async fn task_lifecycle() {
    let (app, _) = app();
    let session = signed_in(&app).await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/tasks/",
            Some(&session),
            Some(r#"{"title":"Taxes","due_date":"2025-04-15","duration":"2h"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = body_json(resp).await;
    assert_eq!(created.tag, "Inbox");

    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/tasks/{}/", created.id),
            Some(&session),
            Some(r#"{"title":"Taxes","due_date":"2025-04-15","duration":"2h","tag":"Due soon"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = body_json(resp).await;
    assert_eq!(updated.tag, "Due soon");

    let resp = app
        .clone()
        .oneshot(request("DELETE", &format!("/api/tasks/{}/", created.id), Some(&session), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(request("GET", "/api/tasks/", Some(&session), None))
        .await
        .unwrap();
    let tasks: Vec<Task> = body_json(resp).await;
    assert!(tasks.is_empty());
}

// --- chat ---

#[tokio::test]
async fn chat_creates_event() {
    let (app, _) = app();
    let session = signed_in(&app).await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/chat/add_event/",
            Some(&session),
            Some(r#"{"query":"Dentist on 2025-05-02 at 2pm"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["event"]["title"], "Dentist");
    assert_eq!(body["event"]["start_time"], "14:00");
    assert_eq!(body["event"]["end_time"], "15:00");

    let resp = app
        .oneshot(request("GET", "/api/events/", Some(&session), None))
        .await
        .unwrap();
    let events: Vec<Event> = body_json(resp).await;
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn chat_without_query_returns_400() {
    let (app, _) = app();
    let session = signed_in(&app).await;
    let resp = app
        .oneshot(request("POST", "/api/chat/add_event/", Some(&session), Some("{}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No query provided");
}

#[tokio::test]
async fn events_are_scoped_to_their_owner() {
    let (app, _) = app();
    let ada = signed_in(&app).await;

    app.clone()
        .oneshot(request(
            "POST",
            "/api/auth/register/",
            None,
            Some(r#"{"username":"bob","password":"pw"}"#),
        ))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login/",
            None,
            Some(r#"{"username":"bob","password":"pw"}"#),
        ))
        .await
        .unwrap();
    let bob = set_cookie(&resp, "sessionid").unwrap();

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/events/",
            Some(&ada),
            Some(r#"{"title":"Private","date":"2025-01-01","start_time":"08:00","end_time":"09:00"}"#),
        ))
        .await
        .unwrap();
    let created: Event = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(request("GET", "/api/events/", Some(&bob), None))
        .await
        .unwrap();
    let visible: Vec<Event> = body_json(resp).await;
    assert!(visible.is_empty());

    let resp = app
        .oneshot(request("DELETE", &format!("/api/events/{}/", created.id), Some(&bob), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
