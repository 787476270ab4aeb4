//! API client core for the agenda service (calendar events, tasks, and
//! chat-driven event creation behind session authentication).
//!
//! # Overview
//! Two layers:
//! - `AgendaClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `Session` drives that client over a `Transport`, acquiring the
//!   anti-forgery token from a `TokenSource` before every call.
//!
//! # Design
//! - The base URL and cookie/header names come from `ClientConfig`; there
//!   is no global state.
//! - Token storage is injected, so tests substitute `MemoryTokenSource`
//!   for the reqwest cookie jar.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use client::AgendaClient;
pub use config::{ClientConfig, ConfigError};
pub use csrf::{MemoryTokenSource, TokenSource};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use transport::{JarTokenSource, ReqwestTransport, Transport};
pub use types::{
    Category, ChatOutcome, ChatQuery, Credentials, CurrentUser, Deleted, Detail, Event, EventInput,
    Registration, Tag, Task, TaskInput, User, AUTHENTICATION_REQUIRED,
};
