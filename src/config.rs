use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CHAT_URL: &str =
    "https://your-api-id.execute-api.region.amazonaws.com/dev/chat";
const DEFAULT_LOGIN_URL: &str =
    "https://your-api-id.execute-api.region.amazonaws.com/dev/login";
const DEFAULT_UPLOAD_URL: &str =
    "https://your-api-id.execute-api.region.amazonaws.com/dev/upload";

/// Backend endpoint configuration. The endpoints are fixed in the deployed
/// client; the config file can override them, which is handy for pointing
/// the client at a staging deployment.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub chat_url: Option<String>,
    pub login_url: Option<String>,
    pub upload_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            chat_url: None,
            login_url: None,
            upload_url: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // First run: write the defaults so the override file is there
            // to edit. Failing to write it is not fatal.
            let config = Self::new();
            if let Err(e) = config.save_to(&config_path) {
                log::warn!("could not write default config: {}", e);
            }
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn chat_url(&self) -> &str {
        self.chat_url.as_deref().unwrap_or(DEFAULT_CHAT_URL)
    }

    pub fn login_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL)
    }

    pub fn upload_url(&self) -> &str {
        self.upload_url.as_deref().unwrap_or(DEFAULT_UPLOAD_URL)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("helpdesk").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_point_at_fixed_endpoints() {
        let config = Config::new();
        assert!(config.chat_url().ends_with("/chat"));
        assert!(config.login_url().ends_with("/login"));
        assert!(config.upload_url().ends_with("/upload"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::new();
        config.chat_url = Some("http://localhost:3000/chat".to_string());
        assert_eq!(config.chat_url(), "http://localhost:3000/chat");
        assert!(config.login_url().ends_with("/login"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.chat_url = Some("http://localhost:3000/chat".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.chat_url(), "http://localhost:3000/chat");
        assert_eq!(loaded.upload_url(), Config::new().upload_url());
    }
}
