use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the transport and the query layer.
///
/// `Clone` so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status_code}: {message}")]
    Http { status_code: u16, message: String },

    /// A newer fetch for the same key replaced this one. Never surfaced to
    /// readers; they wait for the newer fetch instead.
    #[error("Request superseded by a newer fetch")]
    Cancelled,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Resource does not accept mutations: {0}")]
    ReadOnly(String),
}

impl QueryError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            QueryError::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Normalized `{ message, statusCode? }` form handed to result consumers.
    pub fn shape(&self) -> ErrorShape {
        let message = match self {
            QueryError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorShape {
            message,
            status_code: self.status_code(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return QueryError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => QueryError::Http {
                status_code: status.as_u16(),
                message: err.to_string(),
            },
            None => QueryError::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorShape {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Resource already registered: {0}")]
    Duplicate(String),

    #[error("Resource name cannot be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_error_shape_keeps_backend_message() {
        let err = QueryError::Http {
            status_code: 500,
            message: "Internal Server Error".to_string(),
        };

        let shape = err.shape();
        assert_eq!(shape.message, "Internal Server Error");
        assert_eq!(shape.status_code, Some(500));
        assert_eq!(
            serde_json::to_value(&shape).unwrap(),
            json!({"message": "Internal Server Error", "statusCode": 500})
        );
    }

    #[test]
    fn test_network_error_shape_has_no_status() {
        let shape = QueryError::Network("connection refused".to_string()).shape();
        assert_eq!(shape.status_code, None);
        assert!(shape.message.contains("connection refused"));
        assert_eq!(
            serde_json::to_value(&shape).unwrap(),
            json!({"message": "Network error: connection refused"})
        );
    }

    #[test]
    fn test_status_helpers() {
        let unauthorized = QueryError::Http {
            status_code: 401,
            message: "Unauthorized".to_string(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_not_found());
        assert!(!QueryError::Cancelled.is_unauthorized());
    }
}
