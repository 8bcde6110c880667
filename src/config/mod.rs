//! Configuration and session storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::auth::{SessionStore, StoredToken};
use crate::models::User;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PUSHER_CLUSTER: &str = "ap1";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_pusher_cluster() -> String {
    DEFAULT_PUSHER_CLUSTER.to_string()
}

/// Application configuration.
///
/// Endpoint settings come from the config file with env-var overrides
/// (`TINDAHAN_API_URL`, `TINDAHAN_PUSHER_KEY`, `TINDAHAN_PUSHER_CLUSTER`).
/// The persisted session subset is exactly `auth_token` + `user`; everything
/// else merges over compiled defaults on load.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the marketplace REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Pusher application key for the push channel
    #[serde(default)]
    pub pusher_key: Option<String>,
    /// Pusher cluster (e.g. "ap1")
    #[serde(default = "default_pusher_cluster")]
    pub pusher_cluster: String,
    /// Stored API bearer token (from login)
    pub auth_token: Option<StoredToken>,
    /// Profile of the logged-in user (session cache for /api/me)
    pub user: Option<User>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            pusher_key: None,
            pusher_cluster: default_pusher_cluster(),
            auth_token: None,
            user: None,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ph", "tindahan", "tindahan-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config: Self = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TINDAHAN_API_URL") {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(key) = std::env::var("TINDAHAN_PUSHER_KEY") {
            if !key.is_empty() {
                self.pusher_key = Some(key);
            }
        }
        if let Ok(cluster) = std::env::var("TINDAHAN_PUSHER_CLUSTER") {
            if !cluster.is_empty() {
                self.pusher_cluster = cluster;
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }
}

impl SessionStore for Config {
    fn get_auth_token(&self) -> Option<StoredToken> {
        self.auth_token.clone()
    }

    fn get_user(&self) -> Option<User> {
        self.user.clone()
    }

    fn set_session(&mut self, token: StoredToken, user: User) {
        self.auth_token = Some(token);
        self.user = Some(user);
    }

    fn update_user(&mut self, user: User) {
        self.user = Some(user);
    }

    fn clear_session(&mut self) {
        self.auth_token = None;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        // A file that only persisted the session subset still loads.
        let config: Config = toml::from_str(
            r#"
            [auth_token]
            token = "abc"

            [user]
            id = 7
            first_name = "Maria"
            last_name = "Santos"
            role = "user"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.pusher_cluster, DEFAULT_PUSHER_CLUSTER);
        assert_eq!(config.get_auth_token().unwrap().token, "abc");
        assert_eq!(config.get_user().unwrap().id, 7);
    }

    #[test]
    fn session_round_trips_through_toml() {
        let mut config = Config::default();
        config.set_session(
            StoredToken::new("tok".to_string(), None),
            User {
                id: 3,
                first_name: "Juan".into(),
                last_name: "Cruz".into(),
                ..Default::default()
            },
        );

        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.get_auth_token().unwrap().token, "tok");
        assert_eq!(back.get_user().unwrap().full_name(), "Juan Cruz");

        config.clear_session();
        assert!(config.get_auth_token().is_none());
        assert!(config.get_user().is_none());
    }
}
