//! Executing `HttpRequest`s against the network.
//!
//! `Transport` is the seam between the sans-IO client and real I/O. The
//! reqwest implementation owns a cookie jar, so every request carries the
//! session cookies and every `Set-Cookie` (including the anti-forgery
//! token) is remembered. `JarTokenSource` reads the token back out of that
//! same jar.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Url};

use crate::config::ClientConfig;
use crate::csrf::{token_from_cookie_header, TokenSource};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
///
/// Non-2xx statuses are data, not errors: only a missing response is an
/// `Err`, and implementations must return `ApiError::Transport` for it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request).await
    }
}

/// reqwest-backed transport with a shared cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    jar: Arc<Jar>,
    origin: Url,
    cookie_name: String,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let origin = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let jar = Arc::new(Jar::default());

        let mut builder = Client::builder().cookie_provider(Arc::clone(&jar));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            jar,
            origin,
            cookie_name: config.csrf_cookie_name.clone(),
        })
    }

    /// Store a cookie (`name=value`) as if the backend had set it.
    pub fn seed_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.origin);
    }

    /// Current value of a cookie the backend has set for this origin.
    pub fn cookie(&self, name: &str) -> Option<String> {
        read_cookie(&self.jar, &self.origin, name)
    }

    /// Token source reading the anti-forgery cookie from this transport's jar.
    pub fn token_source(&self) -> JarTokenSource {
        JarTokenSource {
            jar: Arc::clone(&self.jar),
            origin: self.origin.clone(),
            cookie_name: self.cookie_name.clone(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = if status == 204 {
            String::new()
        } else {
            response
                .text()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// `TokenSource` over a reqwest cookie jar.
#[derive(Debug, Clone)]
pub struct JarTokenSource {
    jar: Arc<Jar>,
    origin: Url,
    cookie_name: String,
}

impl TokenSource for JarTokenSource {
    fn token(&self) -> Option<String> {
        read_cookie(&self.jar, &self.origin, &self.cookie_name)
    }
}

fn read_cookie(jar: &Jar, origin: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(origin)?;
    let header = header.to_str().ok()?;
    token_from_cookie_header(header, name)
}
