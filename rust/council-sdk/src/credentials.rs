use std::sync::{PoisonError, RwLock};

/// Source of the bearer token attached to every request.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: String);

    /// Forgets the token. Called by the transport after a `401`.
    fn clear(&self);
}

/// Token held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_credentials_lifecycle() {
        let store = MemoryCredentials::new();
        assert!(store.token().is_none());

        store.set_token("abc".to_string());
        assert_eq!(store.token().as_deref(), Some("abc"));

        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let store = MemoryCredentials::with_token("");
        assert!(store.token().is_none());
    }
}
