//! Configuration type definitions for todo-mcp
//!
//! All types implement serde traits for JSON serialization and have sensible defaults,
//! so a partial config file only needs the fields it changes.

use serde::{Deserialize, Serialize};

/// Main configuration struct for todo-mcp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MCP tool service connection (client side)
    pub mcp: McpConfig,
    /// LLM provider configurations (Anthropic, OpenAI)
    pub providers: ProvidersConfig,
    /// Tool-call loop settings
    pub agent: AgentConfig,
    /// Tool service host settings (server side)
    pub server: ServerConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

// ============================================================================
// MCP Configuration
// ============================================================================

/// Default SSE endpoint of the todo tool service.
pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:8001/sse";

/// Connection settings for the MCP tool service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// SSE endpoint URL.
    pub server_url: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_MCP_SERVER_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Configuration for both LLM providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Anthropic (Claude) settings
    pub anthropic: ProviderConfig,
    /// OpenAI settings
    pub openai: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::with_model(DEFAULT_ANTHROPIC_MODEL),
            openai: ProviderConfig::with_model(DEFAULT_OPENAI_MODEL),
        }
    }
}

/// Settings for a single LLM provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
    /// Model identifier sent with every completion request
    pub model: String,
}

impl ProviderConfig {
    fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Default::default()
        }
    }

    /// The API key, if one is set and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Tool-call loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum completion round-trips per query
    pub max_iterations: u32,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,
    /// Optional system prompt
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_tokens: 4096,
            temperature: None,
            system_prompt: None,
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Tool service host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Todo store file (defaults to ~/.todo-mcp/todos.json)
    pub db_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            db_path: None,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Compact single-line output with a `component` field
    #[default]
    Component,
    /// JSON lines
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Append logs to this file instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "warn".to_string(),
            file: None,
        }
    }
}
