pub mod auth;
pub mod mutate;
pub mod query;

use crate::config::CouncilConfig;
use crate::credentials::FileCredentials;
use crate::ui;
use anyhow::{Context, Result};
use council_sdk::{HttpTransport, QueryCache, QueryClient, QueryResult, Value};
use std::path::Path;
use std::sync::Arc;

/// An authenticated client plus the output mode.
pub struct Session {
    pub client: QueryClient,
    pub json: bool,
}

impl Session {
    pub fn open(config_path: &Path, base_url: Option<String>, json: bool) -> Result<Self> {
        let config = CouncilConfig::resolve(config_path, base_url)?;
        let credentials = Arc::new(FileCredentials::from_home()?);

        let transport = HttpTransport::new(config.transport_config()?, credentials)
            .context("Failed to create HTTP client")?
            .on_session_expired(|login_route| {
                ui::print_warning(&format!(
                    "Session expired (login route: {}). Run 'cq auth login' to sign in again.",
                    login_route
                ));
            });

        let client = QueryClient::new(Arc::new(transport), config.registry())
            .with_cache(QueryCache::with_config(config.cache_config()));

        Ok(Self { client, json })
    }
}

/// Turns a read result into its payload, failing on a populated error.
pub(crate) fn settle(result: QueryResult<Value>) -> Result<Option<Value>> {
    if let Some(error) = result.error {
        match error.status_code {
            Some(status) => anyhow::bail!("{} (HTTP {})", error.message, status),
            None => anyhow::bail!("{}", error.message),
        }
    }
    Ok(result.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_sdk::ErrorShape;
    use serde_json::json;

    #[test]
    fn test_settle() {
        let ok = QueryResult {
            data: Some(json!([1])),
            is_loading: false,
            error: None,
        };
        assert_eq!(settle(ok).unwrap(), Some(json!([1])));

        let failed: QueryResult<Value> = QueryResult {
            data: Some(json!([1])),
            is_loading: false,
            error: Some(ErrorShape {
                message: "Internal Server Error".to_string(),
                status_code: Some(500),
            }),
        };
        assert_eq!(
            settle(failed).unwrap_err().to_string(),
            "Internal Server Error (HTTP 500)"
        );
    }
}
