//! Host adapter views.
//!
//! The CSRF core never depends on a concrete web framework. A host implements
//! [`CsrfRequest`] and [`CsrfResponse`] over its own request and response
//! types. [`MemoryRequest`] and [`MemoryResponse`] are in-memory
//! implementations for tests, demos and simple hosts.

use crate::cookie;
use crate::error::{CsrfError, Result};
use http::StatusCode;
use std::collections::HashMap;

/// Server-side session storage as seen by the CSRF store.
pub trait SessionData {
    fn get(&self, field: &str) -> Option<String>;

    fn set(&mut self, field: &str, value: String);
}

impl SessionData for HashMap<String, String> {
    fn get(&self, field: &str) -> Option<String> {
        HashMap::get(self, field).cloned()
    }

    fn set(&mut self, field: &str, value: String) {
        self.insert(field.to_string(), value);
    }
}

impl SessionData for HashMap<String, serde_json::Value> {
    fn get(&self, field: &str) -> Option<String> {
        HashMap::get(self, field).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    fn set(&mut self, field: &str, value: String) {
        self.insert(field.to_string(), serde_json::Value::String(value));
    }
}

/// Normalized inbound request.
pub trait CsrfRequest {
    /// HTTP method
    fn method(&self) -> &str;

    /// Header value, looked up case-insensitively
    fn header(&self, name: &str) -> Option<&str>;

    /// Parsed body field
    fn body_field(&self, name: &str) -> Option<&str>;

    /// Parsed query field
    fn query_field(&self, name: &str) -> Option<&str>;

    /// Plain cookie jar, `None` when no cookie parser ran
    fn cookies(&self) -> Option<&HashMap<String, String>>;

    /// Signed cookie jar holding already verified values
    fn signed_cookies(&self) -> Option<&HashMap<String, String>>;

    /// Session object stored under `key`
    fn session(&self, key: &str) -> Option<&dyn SessionData>;

    fn session_mut(&mut self, key: &str) -> Option<&mut dyn SessionData>;

    /// Upstream cookie signing secret
    fn signing_secret(&self) -> Option<&str>;
}

/// Normalized outbound response.
pub trait CsrfResponse {
    fn header_values(&self, name: &str) -> Vec<String>;

    fn set_header_values(&mut self, name: &str, values: Vec<String>);

    fn set_header(&mut self, name: &str, value: String) {
        self.set_header_values(name, vec![value]);
    }

    /// Add a value while keeping the ones already present.
    fn append_header(&mut self, name: &str, value: String) {
        let mut values = self.header_values(name);
        values.push(value);
        self.set_header_values(name, values);
    }

    fn set_status(&mut self, status: StatusCode);

    fn set_json_body(&mut self, body: serde_json::Value);
}

/// In-memory request.
#[derive(Debug, Clone, Default)]
pub struct MemoryRequest {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub cookies: Option<HashMap<String, String>>,
    pub signed_cookies: Option<HashMap<String, String>>,
    pub sessions: HashMap<String, HashMap<String, String>>,
    pub signing_secret: Option<String>,
}

impl MemoryRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Add a body field
    pub fn with_body_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Add a query field
    pub fn with_query_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Parse a raw query string into query fields
    pub fn with_query_string(mut self, query: &str) -> Result<Self> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| CsrfError::Internal(format!("invalid query string: {}", e)))?;
        self.query.extend(pairs);
        Ok(self)
    }

    /// Parse a raw body into body fields.
    ///
    /// JSON objects contribute their string members; anything else is parsed
    /// as form data.
    pub fn with_body(mut self, body: &[u8]) -> Result<Self> {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
            for (key, value) in map {
                if let serde_json::Value::String(s) = value {
                    self.body.insert(key, s);
                }
            }
            return Ok(self);
        }

        let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map_err(|e| CsrfError::Internal(format!("invalid form body: {}", e)))?;
        self.body.extend(pairs);
        Ok(self)
    }

    /// Attach empty plain and signed cookie jars
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookies.get_or_insert_with(HashMap::new);
        self.signed_cookies.get_or_insert_with(HashMap::new);
        self
    }

    /// Add a plain cookie
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self = self.with_cookie_jar();
        if let Some(jar) = self.cookies.as_mut() {
            jar.insert(name.into(), value.into());
        }
        self
    }

    /// Add an already verified signed cookie
    pub fn with_signed_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self = self.with_cookie_jar();
        if let Some(jar) = self.signed_cookies.as_mut() {
            jar.insert(name.into(), value.into());
        }
        self
    }

    /// Carry the cookies set by `response` into this request, the way a
    /// browser and cookie parser would.
    ///
    /// Signed values are verified with this request's signing secret and
    /// dropped when the signature does not match.
    pub fn with_cookies_from(mut self, response: &MemoryResponse) -> Self {
        self = self.with_cookie_jar();

        for header in response.header_values("set-cookie") {
            let Some((name, value)) = cookie::parse_set_cookie(&header) else {
                continue;
            };

            if value.starts_with(cookie::SIGNED_PREFIX) {
                let verified = self
                    .signing_secret
                    .as_deref()
                    .and_then(|secret| cookie::unsign_cookie_value(&value, secret));
                if let (Some(v), Some(jar)) = (verified, self.signed_cookies.as_mut()) {
                    jar.insert(name, v);
                }
            } else if let Some(jar) = self.cookies.as_mut() {
                jar.insert(name, value);
            }
        }

        self
    }

    /// Attach an empty session under `key`
    pub fn with_session(mut self, key: impl Into<String>) -> Self {
        self.sessions.entry(key.into()).or_default();
        self
    }

    /// Attach a session with existing data under `key`
    pub fn with_session_data(
        mut self,
        key: impl Into<String>,
        data: HashMap<String, String>,
    ) -> Self {
        self.sessions.insert(key.into(), data);
        self
    }

    /// Set the cookie signing secret
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Read a session field
    pub fn session_value(&self, key: &str, field: &str) -> Option<&str> {
        self.sessions.get(key)?.get(field).map(|s| s.as_str())
    }

    /// Detach the session stored under `key`
    pub fn take_session(&mut self, key: &str) -> Option<HashMap<String, String>> {
        self.sessions.remove(key)
    }
}

impl CsrfRequest for MemoryRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    fn body_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(|s| s.as_str())
    }

    fn query_field(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    fn cookies(&self) -> Option<&HashMap<String, String>> {
        self.cookies.as_ref()
    }

    fn signed_cookies(&self) -> Option<&HashMap<String, String>> {
        self.signed_cookies.as_ref()
    }

    fn session(&self, key: &str) -> Option<&dyn SessionData> {
        self.sessions.get(key).map(|s| s as &dyn SessionData)
    }

    fn session_mut(&mut self, key: &str) -> Option<&mut dyn SessionData> {
        self.sessions
            .get_mut(key)
            .map(|s| s as &mut dyn SessionData)
    }

    fn signing_secret(&self) -> Option<&str> {
        self.signing_secret.as_deref()
    }
}

/// In-memory response.
#[derive(Debug, Clone)]
pub struct MemoryResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Option<serde_json::Value>,
}

impl MemoryResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// First value of a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }
}

impl Default for MemoryResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfResponse for MemoryResponse {
    fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn set_header_values(&mut self, name: &str, values: Vec<String>) {
        self.headers.insert(name.to_lowercase(), values);
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_json_body(&mut self, body: serde_json::Value) {
        self.body = Some(body);
    }
}
