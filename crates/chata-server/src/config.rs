//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("address is not specified")]
    MissingAddress,

    #[error("usersDir is not specified")]
    MissingUsersDir,

    #[error("chatsDir is not specified")]
    MissingChatsDir,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address handed to the HTTP layer.
    /// Env: `CHATA_ADDRESS`
    /// Default: `127.0.0.1:8080`
    pub address: String,

    /// Directory holding one file per user.
    /// Env: `CHATA_USERS_DIR`
    /// Default: `./data/users`
    pub users_dir: PathBuf,

    /// Directory holding one file per chat session.
    /// Env: `CHATA_CHATS_DIR`
    /// Default: `./data/chats`
    pub chats_dir: PathBuf,

    /// User id to register as the first admin when the user store is empty.
    /// Env: `CHATA_BOOTSTRAP_ADMIN`
    /// Default: none
    pub bootstrap_admin: Option<String>,

    /// Where the bootstrap admin's private key is written.
    /// Env: `CHATA_ADMIN_KEY_FILE`
    /// Default: `./admin.pem`
    pub admin_key_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            users_dir: PathBuf::from("./data/users"),
            chats_dir: PathBuf::from("./data/chats"),
            bootstrap_admin: None,
            admin_key_file: PathBuf::from("./admin.pem"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("CHATA_ADDRESS") {
            config.address = addr;
        }

        if let Some(dir) = var("CHATA_USERS_DIR") {
            config.users_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("CHATA_CHATS_DIR") {
            config.chats_dir = PathBuf::from(dir);
        }

        if let Some(id) = var("CHATA_BOOTSTRAP_ADMIN") {
            let id = id.trim().to_string();
            if !id.is_empty() {
                config.bootstrap_admin = Some(id);
            }
        }

        if let Some(path) = var("CHATA_ADMIN_KEY_FILE") {
            if path.is_empty() {
                tracing::warn!("Empty CHATA_ADMIN_KEY_FILE, using default");
            } else {
                config.admin_key_file = PathBuf::from(path);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// Reject configurations with empty address or directories.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if self.users_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingUsersDir);
        }
        if self.chats_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingChatsDir);
        }
        Ok(())
    }
}
