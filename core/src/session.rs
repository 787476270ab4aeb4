//! Authenticated API session.
//!
//! # Design
//! `Session` drives `AgendaClient` over a `Transport`, making sure the
//! anti-forgery token is present before each call. Every operation runs
//! the same sequence:
//!
//! 1. read the token from the `TokenSource`;
//! 2. if it is missing, issue exactly one token request and read again,
//!    falling back to an empty token;
//! 3. build, send, parse.
//!
//! The token check takes no lock. Two concurrent calls that both find the
//! store empty each issue a token request; the token endpoint is
//! idempotent, so this is harmless. Nothing is retried. A failed call is
//! logged once under its operation label and returned to the caller.

use tracing::{debug, error, warn};

use crate::client::AgendaClient;
use crate::config::ClientConfig;
use crate::csrf::TokenSource;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{JarTokenSource, ReqwestTransport, Transport};
use crate::types::{
    ChatOutcome, Credentials, CurrentUser, Deleted, Detail, Event, EventInput, Registration, Task,
    TaskInput, User,
};

/// Async client for the agenda API: one method per backend operation, each
/// making sure the anti-forgery token is in place before the request goes
/// out over `T`.
pub struct Session<T, S> {
    client: AgendaClient,
    transport: T,
    tokens: S,
}

impl Session<ReqwestTransport, JarTokenSource> {
    /// Session over reqwest whose token source is the transport's own
    /// cookie jar.
    pub fn connect(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        let tokens = transport.token_source();
        Ok(Self::new(AgendaClient::from_config(config), transport, tokens))
    }
}

impl<T: Transport, S: TokenSource> Session<T, S> {
    pub fn new(client: AgendaClient, transport: T, tokens: S) -> Self {
        Self {
            client,
            transport,
            tokens,
        }
    }

    pub fn client(&self) -> &AgendaClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the cached token, fetching it once if the store is empty.
    ///
    /// A failed fetch is only traced at debug level: the caller proceeds
    /// with an empty token, and whatever the main request then hits is
    /// logged once by the operation.
    pub async fn ensure_csrf_token(&self) -> String {
        if let Some(token) = self.tokens.token() {
            return token;
        }

        debug!("no anti-forgery token cached, requesting one");
        let request = self.client.build_csrf_token();
        let fetched = match self.transport.execute(request).await {
            Ok(response) => self.client.parse_csrf_token(response),
            Err(err) => Err(err),
        };
        if let Err(err) = fetched {
            debug!(error = %err, "anti-forgery token request failed");
        }

        match self.tokens.token() {
            Some(token) => token,
            None => {
                debug!("token endpoint did not set a token, continuing without one");
                String::new()
            }
        }
    }

    // -- auth ---------------------------------------------------------------

    pub async fn register(&self, input: &Registration) -> Result<User, ApiError> {
        self.call(
            "register",
            |c, csrf| c.build_register(input, csrf),
            |c, r| c.parse_register(r),
        )
        .await
    }

    pub async fn login(&self, input: &Credentials) -> Result<User, ApiError> {
        self.call("login", |c, csrf| c.build_login(input, csrf), |c, r| c.parse_login(r))
            .await
    }

    pub async fn logout(&self) -> Result<Detail, ApiError> {
        self.call("logout", |c, csrf| Ok(c.build_logout(csrf)), |c, r| c.parse_logout(r))
            .await
    }

    /// Who is logged in. Not being logged in is `Ok(CurrentUser::Anonymous)`.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.call(
            "get user info",
            |c, _| Ok(c.build_current_user()),
            |c, r| c.parse_current_user(r),
        )
        .await
    }

    // -- events -------------------------------------------------------------

    pub async fn events(&self) -> Result<Vec<Event>, ApiError> {
        self.call(
            "get events",
            |c, _| Ok(c.build_list_events()),
            |c, r| c.parse_list_events(r),
        )
        .await
    }

    pub async fn create_event(&self, input: &EventInput) -> Result<Event, ApiError> {
        self.call(
            "create event",
            |c, csrf| c.build_create_event(input, csrf),
            |c, r| c.parse_create_event(r),
        )
        .await
    }

    pub async fn update_event(&self, id: i64, input: &EventInput) -> Result<Event, ApiError> {
        self.call(
            "update event",
            |c, csrf| c.build_update_event(id, input, csrf),
            |c, r| c.parse_update_event(r),
        )
        .await
    }

    pub async fn delete_event(&self, id: i64) -> Result<Deleted, ApiError> {
        self.call(
            "delete event",
            |c, csrf| Ok(c.build_delete_event(id, csrf)),
            |c, r| c.parse_delete_event(r),
        )
        .await
    }

    // -- tasks --------------------------------------------------------------

    pub async fn tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.call(
            "get tasks",
            |c, _| Ok(c.build_list_tasks()),
            |c, r| c.parse_list_tasks(r),
        )
        .await
    }

    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, ApiError> {
        self.call(
            "create task",
            |c, csrf| c.build_create_task(input, csrf),
            |c, r| c.parse_create_task(r),
        )
        .await
    }

    pub async fn update_task(&self, id: i64, input: &TaskInput) -> Result<Task, ApiError> {
        self.call(
            "update task",
            |c, csrf| c.build_update_task(id, input, csrf),
            |c, r| c.parse_update_task(r),
        )
        .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<Deleted, ApiError> {
        self.call(
            "delete task",
            |c, csrf| Ok(c.build_delete_task(id, csrf)),
            |c, r| c.parse_delete_task(r),
        )
        .await
    }

    // -- chat ---------------------------------------------------------------

    /// Ask the backend to create an event from free text.
    pub async fn create_event_from_chat(&self, query: &str) -> Result<ChatOutcome, ApiError> {
        self.call(
            "chat event creation",
            |c, csrf| c.build_chat_add_event(query, csrf),
            |c, r| c.parse_chat_add_event(r),
        )
        .await
    }

    async fn call<R, B, P>(&self, operation: &'static str, build: B, parse: P) -> Result<R, ApiError>
    where
        B: FnOnce(&AgendaClient, &str) -> Result<HttpRequest, ApiError>,
        P: FnOnce(&AgendaClient, HttpResponse) -> Result<R, ApiError>,
    {
        let result = self.exchange(build, parse).await;
        if let Err(err) = &result {
            if err.is_auth_required() {
                warn!(operation, "authentication required");
            } else {
                error!(operation, error = %err, "request failed");
            }
        }
        result
    }

    async fn exchange<R, B, P>(&self, build: B, parse: P) -> Result<R, ApiError>
    where
        B: FnOnce(&AgendaClient, &str) -> Result<HttpRequest, ApiError>,
        P: FnOnce(&AgendaClient, HttpResponse) -> Result<R, ApiError>,
    {
        let csrf = self.ensure_csrf_token().await;
        let request = build(&self.client, &csrf)?;
        let response = self.transport.execute(request).await?;
        parse(&self.client, response)
    }
}
