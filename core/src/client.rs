//! Stateless HTTP request builder and response parser for the agenda API.
//!
//! # Design
//! `AgendaClient` holds only the base URL and the anti-forgery header name.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Mutating builders take the current CSRF token; an empty token is still
//! sent so the server, not the client, decides whether it is acceptable.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    ChatOutcome, ChatQuery, Credentials, CurrentUser, Deleted, Detail, Event, EventInput,
    Registration, Task, TaskInput, User,
};

/// Synchronous, stateless client for the agenda API.
#[derive(Debug, Clone)]
pub struct AgendaClient {
    base_url: String,
    csrf_header: String,
}

impl AgendaClient {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ClientConfig::with_base_url(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            csrf_header: config.csrf_header_name.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- token --------------------------------------------------------------

    /// The token endpoint only matters for its `Set-Cookie` side effect.
    pub fn build_csrf_token(&self) -> HttpRequest {
        self.read("/csrf-token/")
    }

    pub fn parse_csrf_token(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // -- auth ---------------------------------------------------------------

    pub fn build_register(&self, input: &Registration, csrf: &str) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Post, "/auth/register/", input, csrf)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<User, ApiError> {
        decode(response)
    }

    pub fn build_login(&self, input: &Credentials, csrf: &str) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Post, "/auth/login/", input, csrf)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<User, ApiError> {
        decode(response)
    }

    pub fn build_logout(&self, csrf: &str) -> HttpRequest {
        self.bare(HttpMethod::Post, "/auth/logout/", csrf)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<Detail, ApiError> {
        decode(response)
    }

    pub fn build_current_user(&self) -> HttpRequest {
        self.read("/auth/user/")
    }

    /// A 403 here is the "not logged in" sentinel, not an error.
    pub fn parse_current_user(&self, response: HttpResponse) -> Result<CurrentUser, ApiError> {
        if response.status == 403 {
            return Ok(CurrentUser::Anonymous(Detail::authentication_required()));
        }
        decode::<User>(response).map(CurrentUser::Authenticated)
    }

    // -- events -------------------------------------------------------------

    pub fn build_list_events(&self) -> HttpRequest {
        self.read("/events/")
    }

    pub fn parse_list_events(&self, response: HttpResponse) -> Result<Vec<Event>, ApiError> {
        decode(response)
    }

    pub fn build_create_event(&self, input: &EventInput, csrf: &str) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Post, "/events/", input, csrf)
    }

    pub fn parse_create_event(&self, response: HttpResponse) -> Result<Event, ApiError> {
        decode(response)
    }

    pub fn build_update_event(
        &self,
        id: i64,
        input: &EventInput,
        csrf: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Put, &format!("/events/{id}/"), input, csrf)
    }

    pub fn parse_update_event(&self, response: HttpResponse) -> Result<Event, ApiError> {
        decode(response)
    }

    pub fn build_delete_event(&self, id: i64, csrf: &str) -> HttpRequest {
        self.bare(HttpMethod::Delete, &format!("/events/{id}/"), csrf)
    }

    pub fn parse_delete_event(&self, response: HttpResponse) -> Result<Deleted, ApiError> {
        decode_deleted(response)
    }

    // -- tasks --------------------------------------------------------------

    pub fn build_list_tasks(&self) -> HttpRequest {
        self.read("/tasks/")
    }

    pub fn parse_list_tasks(&self, response: HttpResponse) -> Result<Vec<Task>, ApiError> {
        decode(response)
    }

    pub fn build_create_task(&self, input: &TaskInput, csrf: &str) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Post, "/tasks/", input, csrf)
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        decode(response)
    }

    pub fn build_update_task(
        &self,
        id: i64,
        input: &TaskInput,
        csrf: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.write(HttpMethod::Put, &format!("/tasks/{id}/"), input, csrf)
    }

    pub fn parse_update_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        decode(response)
    }

    pub fn build_delete_task(&self, id: i64, csrf: &str) -> HttpRequest {
        self.bare(HttpMethod::Delete, &format!("/tasks/{id}/"), csrf)
    }

    pub fn parse_delete_task(&self, response: HttpResponse) -> Result<Deleted, ApiError> {
        decode_deleted(response)
    }

    // -- chat ---------------------------------------------------------------

    pub fn build_chat_add_event(&self, query: &str, csrf: &str) -> Result<HttpRequest, ApiError> {
        let body = ChatQuery {
            query: query.to_string(),
        };
        self.write(HttpMethod::Post, "/chat/add_event/", &body, csrf)
    }

    /// A failure envelope (`success: false`) on a 4xx/5xx other than 403 is
    /// returned as data, so the caller sees the backend's `error` message.
    pub fn parse_chat_add_event(&self, response: HttpResponse) -> Result<ChatOutcome, ApiError> {
        if response.status >= 400 && response.status != 403 {
            if let Ok(outcome) = serde_json::from_str::<ChatOutcome>(&response.body) {
                if !outcome.success {
                    return Ok(outcome);
                }
            }
        }
        decode(response)
    }

    // -- helpers ------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn read(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    fn bare(&self, method: HttpMethod, path: &str, csrf: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: vec![(self.csrf_header.clone(), csrf.to_string())],
            body: None,
        }
    }

    fn write<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
        csrf: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                (self.csrf_header.clone(), csrf.to_string()),
            ],
            body: Some(body),
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        _ if response.is_success() => Ok(()),
        403 => Err(ApiError::AuthenticationRequired),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

fn decode_deleted(response: HttpResponse) -> Result<Deleted, ApiError> {
    if response.status == 204 {
        return Ok(Deleted::OK);
    }
    decode(response)
}
