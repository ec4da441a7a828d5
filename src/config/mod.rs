//! Configuration management for todo-mcp
//!
//! Configuration is loaded from `~/.todo-mcp/config.json` with environment variable
//! overrides. The plain variable names (`MCP_SERVER_URL`, `ANTHROPIC_API_KEY`,
//! `OPENAI_API_KEY`, `HOST`, `PORT`) are honoured alongside `TODO_MCP_*` keys.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::Result;

impl Config {
    /// Returns the todo-mcp configuration directory path (~/.todo-mcp)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".todo-mcp")
    }

    /// Returns the path to the config file (~/.todo-mcp/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        // MCP
        if let Ok(val) = std::env::var("MCP_SERVER_URL") {
            self.mcp.server_url = val;
        }
        if let Ok(val) = std::env::var("TODO_MCP_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.mcp.timeout_secs = v;
            }
        }

        // Providers
        if let Ok(val) = std::env::var("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("TODO_MCP_ANTHROPIC_MODEL") {
            self.providers.anthropic.model = val;
        }
        if let Ok(val) = std::env::var("TODO_MCP_ANTHROPIC_API_BASE") {
            self.providers.anthropic.api_base = Some(val);
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("TODO_MCP_OPENAI_MODEL") {
            self.providers.openai.model = val;
        }
        if let Ok(val) = std::env::var("TODO_MCP_OPENAI_API_BASE") {
            self.providers.openai.api_base = Some(val);
        }

        // Agent
        if let Ok(val) = std::env::var("TODO_MCP_MAX_ITERATIONS") {
            if let Ok(v) = val.parse() {
                self.agent.max_iterations = v;
            }
        }
        if let Ok(val) = std::env::var("TODO_MCP_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.agent.max_tokens = v;
            }
        }

        // Server
        if let Ok(val) = std::env::var("HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(v) = val.parse() {
                self.server.port = v;
            }
        }
        if let Ok(val) = std::env::var("TODO_MCP_DB_PATH") {
            self.server.db_path = Some(val);
        }

        // Logging
        if let Ok(val) = std::env::var("TODO_MCP_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Returns the expanded todo store path.
    pub fn db_path(&self) -> PathBuf {
        match &self.server.db_path {
            Some(path) => expand_home(path),
            None => Self::dir().join("todos.json"),
        }
    }
}

/// Expand ~ to home directory in a path string
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    PathBuf::from(path)
}
