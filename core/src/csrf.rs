//! Where the anti-forgery token comes from.
//!
//! The backend issues the token as a cookie. `TokenSource` abstracts the
//! cookie store so a `Session` can read the token without knowing whether
//! it lives in a reqwest jar or a test fake.

use std::sync::{Arc, RwLock};

/// Read access to the current anti-forgery token.
///
/// Implementations return `None` when no non-empty token is stored.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

/// In-memory token store. Stands in for a browser cookie store in tests
/// and for hosts that manage cookies themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenSource {
    value: RwLock<Option<String>>,
}

impl MemoryTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let source = Self::new();
        source.set(token);
        source
    }

    pub fn set(&self, token: &str) {
        if let Ok(mut guard) = self.value.write() {
            *guard = Some(token.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.value.write() {
            *guard = None;
        }
    }

    /// Pick the token out of a `Set-Cookie` value, if it names `cookie_name`.
    pub fn absorb_set_cookie(&self, set_cookie: &str, cookie_name: &str) -> bool {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        match token_from_cookie_header(pair, cookie_name) {
            Some(token) => {
                self.set(&token);
                true
            }
            None => false,
        }
    }
}

impl TokenSource for MemoryTokenSource {
    fn token(&self) -> Option<String> {
        self.value
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .filter(|t| !t.is_empty())
    }
}

/// Extract `name`'s value from a `Cookie` header (`a=1; csrftoken=xyz`).
///
/// Returns `None` when the cookie is missing or empty.
pub fn token_from_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
