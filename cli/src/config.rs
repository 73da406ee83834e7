use anyhow::{Context, Result};
use council_sdk::{
    CacheConfig, ResourceDescriptor, ResourceRegistry, TransportConfig, DEFAULT_LOGIN_ROUTE,
    DEFAULT_SERVICE, DEFAULT_STALE_TIME,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "council.toml";

/// Configuration read from council.toml. Every field is optional; the
/// file itself may be absent when the base URL comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path segment every dashboard resource lives under.
    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_login_route")]
    pub login_route: String,

    #[serde(default = "default_stale_time")]
    pub stale_time_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Additions to, or overrides of, the built-in resource catalog.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,

    /// List endpoint, e.g. "/api/Rooms"
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_param: Option<String>,

    #[serde(default)]
    pub mutable: bool,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_login_route() -> String {
    DEFAULT_LOGIN_ROUTE.to_string()
}

fn default_stale_time() -> u64 {
    DEFAULT_STALE_TIME.as_secs()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            service: default_service(),
            login_route: default_login_route(),
            stale_time_secs: default_stale_time(),
            request_timeout_secs: default_request_timeout(),
            resources: Vec::new(),
        }
    }
}

impl CouncilConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: CouncilConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load config, returning None if file doesn't exist
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Loads the file if present and applies a base URL from the command
    /// line or `COUNCIL_API_URL`.
    pub fn resolve<P: AsRef<Path>>(path: P, base_url: Option<String>) -> Result<Self> {
        let mut config = Self::load_optional(path)?.unwrap_or_default();
        if let Some(url) = base_url {
            config.base_url = Some(url);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("base_url must start with http:// or https://: {}", url);
            }
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty() {
                anyhow::bail!("Resource name cannot be empty");
            }
            if !names.insert(resource.name.as_str()) {
                anyhow::bail!("Duplicate resource name: {}", resource.name);
            }
            if !resource.path.starts_with('/') {
                anyhow::bail!(
                    "Resource '{}' path must start with '/': {}",
                    resource.name,
                    resource.path
                );
            }
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No API base URL configured.\n\n\
                 Set base_url in {} or export COUNCIL_API_URL.",
                DEFAULT_CONFIG_FILE
            )
        })
    }

    /// Built-in dashboard catalog with configured overrides applied.
    pub fn registry(&self) -> ResourceRegistry {
        let mut registry = ResourceRegistry::dashboard(&self.service);
        for resource in &self.resources {
            let mut descriptor = ResourceDescriptor::new(&resource.name, &resource.path);
            if let Some(detail_path) = &resource.detail_path {
                descriptor = descriptor.with_detail_path(detail_path);
            }
            if let Some(id_param) = &resource.id_param {
                descriptor = descriptor.with_id_param(id_param);
            }
            if resource.mutable {
                descriptor = descriptor.mutable();
            }
            registry.replace(descriptor);
        }
        registry
    }

    pub fn transport_config(&self) -> Result<TransportConfig> {
        Ok(TransportConfig::new(self.base_url()?)
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_login_route(&self.login_route))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default().with_stale_time(Duration::from_secs(self.stale_time_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_with_defaults() {
        let file = write_config(r#"base_url = "https://council.example.org""#);
        let config = CouncilConfig::load(file.path()).unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://council.example.org"));
        assert_eq!(config.service, "api");
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.stale_time_secs, 30);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_resource_overrides_replace_catalog_entries() {
        let file = write_config(
            r#"
base_url = "http://localhost:5000"
service = "council"

[[resources]]
name = "rooms"
path = "/facilities/Rooms"
id_param = "RoomId"

[[resources]]
name = "agendas"
path = "/council/Agendas"
detail_path = "/council/Agendas/get"
mutable = true
"#,
        );
        let registry = CouncilConfig::load(file.path()).unwrap().registry();

        let rooms = registry.get("rooms").unwrap();
        assert_eq!(rooms.list_path, "/facilities/Rooms");
        assert_eq!(rooms.id_param_name, "RoomId");
        assert!(!rooms.mutable);

        let agendas = registry.get("agendas").unwrap();
        assert_eq!(agendas.detail_path, "/council/Agendas/get");
        assert!(agendas.mutable);

        assert_eq!(registry.get("committees").unwrap().list_path, "/council/Committees");
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn test_duplicate_resource_names_rejected() {
        let file = write_config(
            r#"
[[resources]]
name = "rooms"
path = "/a/Rooms"

[[resources]]
name = "rooms"
path = "/b/Rooms"
"#,
        );
        let err = CouncilConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate resource name: rooms"));
    }

    #[test]
    fn test_resolve_without_file_uses_override() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(DEFAULT_CONFIG_FILE);

        let config =
            CouncilConfig::resolve(&missing, Some("https://api.example.org".to_string())).unwrap();
        assert_eq!(config.base_url().unwrap(), "https://api.example.org");

        let unset = CouncilConfig::resolve(&missing, None).unwrap();
        assert!(unset.base_url().is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let file = write_config(r#"base_url = "council.example.org""#);
        assert!(CouncilConfig::load(file.path()).is_err());
    }
}
