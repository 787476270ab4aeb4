//! In-memory stand-in for the agenda backend.
//!
//! Serves the `/api` surface the client talks to, with the parts of the
//! backend's session and anti-forgery behaviour the client depends on:
//! - `GET /api/csrf-token/` sets the `csrftoken` cookie. The token is fixed
//!   for the lifetime of the server, so issuing it twice is idempotent.
//! - Mutating requests need an `X-CSRFToken` header equal to that cookie.
//! - Protected routes answer 403 without a valid `sessionid` cookie.
//! - Every request path is counted so tests can assert on traffic.

pub mod chat;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";
pub const SESSION_COOKIE: &str = "sessionid";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct RegisterUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct Login {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub category: String,
    pub completed: bool,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct EventBody {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub due_date: NaiveDate,
    pub duration: String,
    pub tag: String,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct TaskBody {
    pub title: String,
    pub due_date: NaiveDate,
    pub duration: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub query: String,
}

const CATEGORIES: [&str; 4] = ["work", "personal", "meeting", "other"];
const TAGS: [&str; 2] = ["Due soon", "Inbox"];

fn default_category() -> String {
    "work".to_string()
}

fn default_tag() -> String {
    "Inbox".to_string()
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct Store {
    accounts: Vec<Account>,
    sessions: HashMap<String, i64>,
    events: BTreeMap<i64, (i64, Event)>,
    tasks: BTreeMap<i64, (i64, Task)>,
    last_user: i64,
    last_event: i64,
    last_task: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Store>>,
    csrf_token: Arc<str>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_csrf_token(&Uuid::new_v4().simple().to_string())
    }

    pub fn with_csrf_token(token: &str) -> Self {
        Self {
            db: Arc::new(RwLock::new(Store::default())),
            csrf_token: Arc::from(token),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Number of requests received for an exact path such as `/api/csrf-token/`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|h| h.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn record(&self, path: &str) {
        if let Ok(mut hits) = self.hits.lock() {
            *hits.entry(path.to_string()).or_default() += 1;
        }
    }

    fn csrf_cookie(&self) -> String {
        format!("{CSRF_COOKIE}={}; Path=/; SameSite=Lax", self.csrf_token)
    }

    async fn session_user(&self, headers: &HeaderMap) -> Option<i64> {
        let session = cookie_value(headers, SESSION_COOKIE)?;
        self.db.read().await.sessions.get(&session).copied()
    }

    /// Session check first, anti-forgery check second.
    async fn authorize(&self, headers: &HeaderMap, mutating: bool) -> Result<i64, Failure> {
        let user = self
            .session_user(headers)
            .await
            .ok_or_else(|| Failure::forbidden("Authentication credentials were not provided."))?;
        if mutating {
            self.check_csrf(headers)?;
        }
        Ok(user)
    }

    fn check_csrf(&self, headers: &HeaderMap) -> Result<(), Failure> {
        let cookie = cookie_value(headers, CSRF_COOKIE)
            .ok_or_else(|| Failure::forbidden("CSRF Failed: CSRF cookie not set."))?;
        let sent = headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if sent.is_empty() {
            return Err(Failure::forbidden("CSRF Failed: CSRF token missing."));
        }
        if sent != cookie || cookie != *self.csrf_token {
            return Err(Failure::forbidden("CSRF Failed: CSRF token incorrect."));
        }
        Ok(())
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: Value,
}

impl Failure {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    fn forbidden(detail: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, json!({ "detail": detail }))
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, json!({ "detail": "Not found." }))
    }

    fn invalid(field: &str, message: &str) -> Self {
        let mut errors = Map::new();
        errors.insert(field.to_string(), json!([message]));
        Self::new(StatusCode::BAD_REQUEST, Value::Object(errors))
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Malformed bodies are a 400 with the parser's message, not axum's 422.
fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Failure> {
    body.map(|Json(v)| v)
        .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, json!({ "detail": e.body_text() })))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/csrf-token/", get(csrf_token))
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
        .route("/auth/logout/", post(logout))
        .route("/auth/user/", get(current_user))
        .route("/events/", get(list_events).post(create_event))
        .route("/events/{id}/", put(update_event).delete(delete_event))
        .route("/tasks/", get(list_tasks).post(create_task))
        .route("/tasks/{id}/", put(update_task).delete(delete_task))
        .route("/chat/add_event/", post(chat_add_event));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record_hit))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn record_hit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    debug!(method = %request.method(), path = %path, "request");
    state.record(&path);
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

async fn csrf_token(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, state.csrf_cookie())]),
        Json(json!({ "detail": "CSRF cookie set" })),
    )
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<Response, Failure> {
    state.check_csrf(&headers)?;
    let input = payload(body)?;

    let mut errors = Map::new();
    if input.username.trim().is_empty() {
        errors.insert("username".into(), json!(["This field is required."]));
    }
    if input.password.is_empty() {
        errors.insert("password".into(), json!(["This field is required."]));
    }

    let mut db = state.db.write().await;
    if db.accounts.iter().any(|a| a.user.username == input.username) {
        errors.insert(
            "username".into(),
            json!(["A user with that username already exists."]),
        );
    }
    if !errors.is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, Value::Object(errors)));
    }

    let user = User {
        id: next_id(&mut db.last_user),
        username: input.username,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
    };
    db.accounts.push(Account {
        user: user.clone(),
        password: input.password,
    });

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, state.csrf_cookie())]),
        Json(user),
    )
        .into_response())
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Login>, JsonRejection>,
) -> Result<Response, Failure> {
    state.check_csrf(&headers)?;
    let input = payload(body)?;

    let mut db = state.db.write().await;
    let user = db
        .accounts
        .iter()
        .find(|a| a.user.username == input.username && a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or_else(|| {
            Failure::new(
                StatusCode::UNAUTHORIZED,
                json!({ "detail": "Invalid credentials" }),
            )
        })?;

    let session = Uuid::new_v4().simple().to_string();
    db.sessions.insert(session.clone(), user.id);

    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax"),
            ),
            (header::SET_COOKIE, state.csrf_cookie()),
        ]),
        Json(user),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, Failure> {
    state.authorize(&headers, true).await?;
    if let Some(session) = cookie_value(&headers, SESSION_COOKIE) {
        state.db.write().await.sessions.remove(&session);
    }
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"),
        )]),
        Json(json!({ "detail": "Successfully logged out" })),
    )
        .into_response())
}

async fn current_user(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, Failure> {
    let id = state.authorize(&headers, false).await?;
    let db = state.db.read().await;
    db.accounts
        .iter()
        .find(|a| a.user.id == id)
        .map(|a| Json(a.user.clone()))
        .ok_or_else(|| Failure::forbidden("Authentication credentials were not provided."))
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

fn validate_event(input: &EventBody) -> Result<(), Failure> {
    if input.title.trim().is_empty() {
        return Err(Failure::invalid("title", "This field may not be blank."));
    }
    if !CATEGORIES.contains(&input.category.as_str()) {
        return Err(Failure::invalid(
            "category",
            &format!("\"{}\" is not a valid choice.", input.category),
        ));
    }
    Ok(())
}

fn event_from(id: i64, input: EventBody) -> Event {
    Event {
        id,
        title: input.title,
        date: input.date,
        start_time: input.start_time,
        end_time: input.end_time,
        category: input.category,
        completed: input.completed,
        color: input.color,
    }
}

async fn list_events(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Event>>, Failure> {
    let user = state.authorize(&headers, false).await?;
    let db = state.db.read().await;
    Ok(Json(
        db.events
            .values()
            .filter(|(owner, _)| *owner == user)
            .map(|(_, e)| e.clone())
            .collect(),
    ))
}

async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EventBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), Failure> {
    let user = state.authorize(&headers, true).await?;
    let input = payload(body)?;
    validate_event(&input)?;

    let mut db = state.db.write().await;
    let event = event_from(next_id(&mut db.last_event), input);
    db.events.insert(event.id, (user, event.clone()));
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Result<Json<EventBody>, JsonRejection>,
) -> Result<Json<Event>, Failure> {
    let user = state.authorize(&headers, true).await?;
    let input = payload(body)?;
    validate_event(&input)?;

    let mut db = state.db.write().await;
    let (_, slot) = db
        .events
        .get_mut(&id)
        .filter(|(owner, _)| *owner == user)
        .ok_or_else(Failure::not_found)?;
    *slot = event_from(id, input);
    Ok(Json(slot.clone()))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, Failure> {
    let user = state.authorize(&headers, true).await?;
    let mut db = state.db.write().await;
    let owned = matches!(db.events.get(&id), Some((owner, _)) if *owner == user);
    if !owned {
        return Err(Failure::not_found());
    }
    db.events.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Task handlers
// ---------------------------------------------------------------------------

fn validate_task(input: &TaskBody) -> Result<(), Failure> {
    if input.title.trim().is_empty() {
        return Err(Failure::invalid("title", "This field may not be blank."));
    }
    if !TAGS.contains(&input.tag.as_str()) {
        return Err(Failure::invalid(
            "tag",
            &format!("\"{}\" is not a valid choice.", input.tag),
        ));
    }
    Ok(())
}

fn task_from(id: i64, input: TaskBody) -> Task {
    Task {
        id,
        title: input.title,
        due_date: input.due_date,
        duration: input.duration,
        tag: input.tag,
        completed: input.completed,
    }
}

async fn list_tasks(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Task>>, Failure> {
    let user = state.authorize(&headers, false).await?;
    let db = state.db.read().await;
    Ok(Json(
        db.tasks
            .values()
            .filter(|(owner, _)| *owner == user)
            .map(|(_, t)| t.clone())
            .collect(),
    ))
}

async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TaskBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), Failure> {
    let user = state.authorize(&headers, true).await?;
    let input = payload(body)?;
    validate_task(&input)?;

    let mut db = state.db.write().await;
    let task = task_from(next_id(&mut db.last_task), input);
    db.tasks.insert(task.id, (user, task.clone()));
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Result<Json<TaskBody>, JsonRejection>,
) -> Result<Json<Task>, Failure> {
    let user = state.authorize(&headers, true).await?;
    let input = payload(body)?;
    validate_task(&input)?;

    let mut db = state.db.write().await;
    let (_, slot) = db
        .tasks
        .get_mut(&id)
        .filter(|(owner, _)| *owner == user)
        .ok_or_else(Failure::not_found)?;
    *slot = task_from(id, input);
    Ok(Json(slot.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, Failure> {
    let user = state.authorize(&headers, true).await?;
    let mut db = state.db.write().await;
    let owned = matches!(db.tasks.get(&id), Some((owner, _)) if *owner == user);
    if !owned {
        return Err(Failure::not_found());
    }
    db.tasks.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn chat_add_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<Value>, Failure> {
    let user = state.authorize(&headers, true).await?;
    let input = payload(body)?;
    if input.query.trim().is_empty() {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": "No query provided" }),
        ));
    }

    let details = chat::extract(&input.query, Local::now().date_naive());
    let mut db = state.db.write().await;
    let event = Event {
        id: next_id(&mut db.last_event),
        title: details.title,
        date: details.date,
        start_time: details.start_time,
        end_time: details.end_time,
        category: default_category(),
        completed: false,
        color: None,
    };
    db.events.insert(event.id, (user, event.clone()));
    Ok(Json(json!({ "success": true, "event": event })))
}
