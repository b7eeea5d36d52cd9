//! Environment-driven configuration
//!
//! All settings come from environment variables (optionally loaded from a
//! `.env` file by `main`), collected once at startup into a [`Config`]
//! that is handed to every collaborator.

use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Path of the JSON snapshot holding the code/URL index.
    pub snapshot_file: String,
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    /// Append log output to this file instead of stdout when set.
    pub log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            snapshot_file: env::var("SNAPSHOT_FILE")
                .unwrap_or_else(|_| "data/urlMappings.json".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            log_file: env::var("LOG_FILE").ok().filter(|f| !f.is_empty()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Base of the shortened URLs handed back to clients.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            snapshot_file: "data/urlMappings.json".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            log_file: None,
        }
    }
}
