//! Domain DTOs for the agenda API.
//!
//! # Design
//! Each endpoint gets an explicit record type so shape drift between client
//! and backend fails at decode time instead of leaking untyped JSON to
//! callers. The mock-server crate defines its own copies; integration tests
//! catch any schema drift between the two.
//!
//! Dates travel as `YYYY-MM-DD` (`chrono::NaiveDate`). Times stay as the
//! backend's `HH:MM` strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Message the sentinel carries when the current user is not logged in.
pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Login payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Account creation payload. Optional profile fields are omitted from the
/// JSON when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// A bare `{ "detail": ... }` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn authentication_required() -> Self {
        Self {
            detail: AUTHENTICATION_REQUIRED.to_string(),
        }
    }
}

/// Result of asking the backend who the caller is.
///
/// `Anonymous` is a normal outcome, not an error: it lets a caller render a
/// logged-out state without an error path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CurrentUser {
    Authenticated(User),
    Anonymous(Detail),
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Authenticated(user) => Some(user),
            CurrentUser::Anonymous(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Work,
    Personal,
    Meeting,
    Other,
}

/// A calendar event returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub color: Option<String>,
}

/// Payload for creating or replacing an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventInput {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Event {
    /// True when every writable field matches `input`.
    pub fn matches(&self, input: &EventInput) -> bool {
        self.title == input.title
            && self.date == input.date
            && self.start_time == input.start_time
            && self.end_time == input.end_time
            && self.category == input.category
            && self.completed == input.completed
            && self.color == input.color
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tag {
    #[serde(rename = "Due soon")]
    DueSoon,
    #[default]
    Inbox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub due_date: NaiveDate,
    pub duration: String,
    #[serde(default)]
    pub tag: Tag,
    #[serde(default)]
    pub completed: bool,
}

/// Payload for creating or replacing a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub due_date: NaiveDate,
    pub duration: String,
    #[serde(default)]
    pub tag: Tag,
    #[serde(default)]
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Chat and acknowledgements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatQuery {
    pub query: String,
}

/// Envelope returned by the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a delete. A 204 becomes `{ "success": true }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
    #[serde(default = "yes")]
    pub success: bool,
}

impl Deleted {
    pub const OK: Deleted = Deleted { success: true };
}

fn yes() -> bool {
    true
}
