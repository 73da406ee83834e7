//! HTTP plumbing shared by every query.
//!
//! [`Transport`] is the seam the query layer talks to. [`HttpTransport`] is
//! the production implementation: it injects the bearer token, maps
//! non-2xx responses to [`QueryError::Http`], handles `401` by clearing the
//! stored token and firing the session-expired hook, and normalizes the
//! casing of every field name in the response body.

use crate::config::TransportConfig;
use crate::credentials::CredentialStore;
use crate::error::QueryError;
use crate::response::normalize_field_names;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        })
    }
}

/// One outbound call, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request and returns the decoded JSON body.
    async fn execute(&self, request: ApiRequest) -> Result<Value, QueryError>;
}

/// Called with the login route after the backend rejects the token.
pub type SessionExpiredHook = Arc<dyn Fn(&str) + Send + Sync>;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    login_route: String,
    credentials: Arc<dyn CredentialStore>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl HttpTransport {
    pub fn new(
        config: TransportConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, QueryError> {
        Url::parse(&config.base_url).map_err(|e| {
            QueryError::Network(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_route: config.login_route,
            credentials,
            on_session_expired: None,
        })
    }

    pub fn on_session_expired(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches a file response as raw bytes. Same auth and status handling
    /// as [`Transport::execute`], without JSON decoding.
    pub async fn download(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Bytes, QueryError> {
        let request = ApiRequest::get(path).with_query(query);
        let response = self.send(&request).await?;
        Ok(response.bytes().await?)
    }

    fn url(&self, path: &str) -> Result<Url, QueryError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined)
            .map_err(|e| QueryError::Network(format!("invalid request URL '{}': {}", joined, e)))
    }

    async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, QueryError> {
        let url = self.url(&request.path)?;
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .query(&request.query);

        if let Some(token) = self.credentials.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, path = %request.path, error = %e, "request failed");
            QueryError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.expire_session();
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        tracing::warn!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            %message,
            "backend returned an error status"
        );
        Err(QueryError::Http {
            status_code: status.as_u16(),
            message,
        })
    }

    fn expire_session(&self) {
        tracing::info!(login_route = %self.login_route, "session expired; clearing stored token");
        self.credentials.clear();
        if let Some(hook) = &self.on_session_expired {
            hook(&self.login_route);
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, QueryError> {
        tracing::debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.send(&request).await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_slice(&body)?;
        Ok(normalize_field_names(value))
    }
}

/// Pulls a human-readable message out of an error body, if it has one.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let value = normalize_field_names(value);
    ["message", "error", "title", "detail"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentials;

    #[test]
    fn test_error_message_fields() {
        assert_eq!(
            error_message(br#"{"Message": "Committee not found"}"#).as_deref(),
            Some("Committee not found")
        );
        assert_eq!(
            error_message(br#"{"title": "Bad Request", "status": 400}"#).as_deref(),
            Some("Bad Request")
        );
        assert_eq!(error_message(b"<html>oops</html>"), None);
        assert_eq!(error_message(br#"{"message": ""}"#), None);
    }

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::new(
            TransportConfig::new("https://council.example.org/backend/"),
            Arc::new(MemoryCredentials::new()),
        )
        .unwrap();

        assert_eq!(
            transport.url("/api/Rooms").unwrap().as_str(),
            "https://council.example.org/backend/api/Rooms"
        );
        assert_eq!(
            transport.url("api/Rooms").unwrap().as_str(),
            "https://council.example.org/backend/api/Rooms"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpTransport::new(
            TransportConfig::new("not a url"),
            Arc::new(MemoryCredentials::new()),
        );
        assert!(matches!(result, Err(QueryError::Network(_))));
    }

    #[test]
    fn test_query_param_lookup() {
        let request = ApiRequest::get("/api/Committees/details")
            .with_query(vec![("Id".to_string(), "42".to_string())]);
        assert_eq!(request.query_param("Id"), Some("42"));
        assert_eq!(request.query_param("id"), None);
    }
}
