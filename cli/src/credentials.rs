use anyhow::{Context, Result};
use council_sdk::CredentialStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
struct Credentials {
    token: String,
}

/// Bearer token persisted in `~/.council/credentials.toml`.
///
/// The file is read on every call, so a login from another shell is picked
/// up without restarting anything.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_home() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".council").join("credentials.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials file: {}", self.path.display()))?;
        let credentials: Credentials =
            toml::from_str(&content).context("Failed to parse credentials file")?;

        Ok(Some(credentials.token).filter(|t| !t.is_empty()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string(&Credentials {
            token: token.to_string(),
        })?;
        fs::write(&self.path, content).context("Failed to save token")?;

        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to delete credentials file")?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentials {
    fn token(&self) -> Option<String> {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable credentials");
            None
        })
    }

    fn set_token(&self, token: String) {
        if let Err(e) = self.save(&token) {
            tracing::warn!(error = %e, "could not store token");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.delete() {
            tracing::warn!(error = %e, "could not remove stored token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentials::new(dir.path().join("nested").join("credentials.toml"));

        assert_eq!(store.load().unwrap(), None);

        store.save("abc123").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));
        assert_eq!(store.token().as_deref(), Some("abc123"));

        store.clear();
        assert!(!store.path().exists());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_corrupt_file_counts_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        fs::write(&path, "not = [valid").unwrap();

        let store = FileCredentials::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.token(), None);
    }
}
