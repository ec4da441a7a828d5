//! Chat command handlers (single-shot + interactive).

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use todo_mcp::agent::{ChatSession, QueryObserver, QueryOutcome};
use todo_mcp::config::{Config, ProviderConfig};
use todo_mcp::providers::{ClaudeProvider, CompletionOptions, OpenAIProvider, ProviderAdapter};
use todo_mcp::session::{ToolCallRequest, ToolCallResult};
use todo_mcp::TodoMcpError;

use super::ChatArgs;

const ITERATION_LIMIT_MESSAGE: &str = "Maximum iterations reached without a final answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderKind {
    Anthropic,
    OpenAI,
}

impl ProviderKind {
    fn banner(self) -> &'static str {
        match self {
            Self::Anthropic => "=== Todo MCP Interactive Client ===",
            Self::OpenAI => "=== Todo MCP Interactive Client (OpenAI) ===",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Run a chat client against the configured MCP server.
pub(crate) async fn cmd_chat(config: Config, kind: ProviderKind, args: ChatArgs) -> Result<()> {
    let options = completion_options(&config);

    match kind {
        ProviderKind::Anthropic => {
            let settings = &config.providers.anthropic;
            let api_key = require_api_key(settings, kind)?;
            let model = args.model.as_deref().unwrap_or(&settings.model);
            let mut provider = ClaudeProvider::new(api_key, model).with_options(options);
            if let Some(base) = settings.api_base.as_deref() {
                provider = provider.with_api_base(base);
            }
            run_session(provider, &config, kind, args).await
        }
        ProviderKind::OpenAI => {
            let settings = &config.providers.openai;
            let api_key = require_api_key(settings, kind)?;
            let model = args.model.as_deref().unwrap_or(&settings.model);
            let mut provider = OpenAIProvider::new(api_key, model).with_options(options);
            if let Some(base) = settings.api_base.as_deref() {
                provider = provider.with_api_base(base);
            }
            run_session(provider, &config, kind, args).await
        }
    }
}

fn require_api_key(settings: &ProviderConfig, kind: ProviderKind) -> Result<&str> {
    settings.api_key().ok_or_else(|| {
        anyhow!(TodoMcpError::Config(format!(
            "{} is not set. Export it or add it to {}",
            kind.api_key_var(),
            Config::path().display()
        )))
    })
}

fn completion_options(config: &Config) -> CompletionOptions {
    let mut options = CompletionOptions::new().with_max_tokens(config.agent.max_tokens);
    if let Some(temperature) = config.agent.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(prompt) = config.agent.system_prompt.as_deref() {
        options = options.with_system_prompt(prompt);
    }
    options
}

async fn run_session<P: ProviderAdapter>(
    provider: P,
    config: &Config,
    kind: ProviderKind,
    args: ChatArgs,
) -> Result<()> {
    let url = args.url.unwrap_or_else(|| config.mcp.server_url.clone());
    let timeout = Duration::from_secs(config.mcp.timeout_secs);

    let session = ChatSession::connect(provider, &url, timeout)
        .await
        .with_context(|| format!("Failed to connect to MCP server at {}", url))?
        .with_max_iterations(config.agent.max_iterations);

    let query = args.query.join(" ");
    session
        .run(move |session| {
            Box::pin(async move {
                if query.is_empty() {
                    tokio::select! {
                        result = interactive(session, kind) => result,
                        _ = tokio::signal::ctrl_c() => {
                            println!("\nGoodbye!");
                            Ok(())
                        }
                    }
                } else {
                    tokio::select! {
                        result = single_shot(session, &query) => result,
                        _ = tokio::signal::ctrl_c() => Err(anyhow!("Interrupted")),
                    }
                }
            })
        })
        .await
}

async fn single_shot<P: ProviderAdapter>(session: &mut ChatSession<P>, query: &str) -> Result<()> {
    match session.process_query(query).await? {
        QueryOutcome::Answer(text) => {
            println!("{}", text);
            Ok(())
        }
        QueryOutcome::IterationLimit { .. } => Err(anyhow!(ITERATION_LIMIT_MESSAGE)),
    }
}

async fn interactive<P: ProviderAdapter>(
    session: &mut ChatSession<P>,
    kind: ProviderKind,
) -> Result<()> {
    println!("Connected to MCP server. Available tools:");
    for tool in session.tools() {
        println!("  - {}: {}", tool.name, tool.description);
    }
    println!();
    println!("{}", kind.banner());
    println!("Type your requests or 'quit' to exit.");
    println!();

    let observer = ConsoleObserver;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            println!("Goodbye!");
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit(input) {
            println!("Goodbye!");
            break;
        }

        println!();
        match session.process_query_with(input, &observer).await {
            Ok(QueryOutcome::Answer(text)) => {
                println!("Assistant: {}", text);
                println!();
            }
            Ok(QueryOutcome::IterationLimit { .. }) => {
                println!("{}", ITERATION_LIMIT_MESSAGE);
                println!();
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
            }
        }
    }

    Ok(())
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q")
}

/// Prints tool progress for interactive sessions.
struct ConsoleObserver;

impl QueryObserver for ConsoleObserver {
    fn on_tool_call(&self, call: &ToolCallRequest) {
        println!("🔧 Calling tool: {}", call.tool_name);
        println!("   Input: {}", call.arguments_json());
    }

    fn on_tool_result(&self, _call: &ToolCallRequest, result: &ToolCallResult) {
        if result.is_error {
            println!("   Error: {}", result.content);
        } else {
            println!("   Result: {}", result.content);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keywords() {
        assert!(is_quit("quit"));
        assert!(is_quit("EXIT"));
        assert!(is_quit("Q"));
        assert!(!is_quit("quitter"));
        assert!(!is_quit("list my todos"));
    }

    #[test]
    fn test_banners() {
        assert_eq!(
            ProviderKind::Anthropic.banner(),
            "=== Todo MCP Interactive Client ==="
        );
        assert_eq!(
            ProviderKind::OpenAI.banner(),
            "=== Todo MCP Interactive Client (OpenAI) ==="
        );
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let settings = ProviderConfig::default();
        let err = require_api_key(&settings, ProviderKind::OpenAI).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(matches!(
            err.downcast_ref::<TodoMcpError>(),
            Some(TodoMcpError::Config(_))
        ));
    }

    #[test]
    fn test_completion_options_from_config() {
        let mut config = Config::default();
        config.agent.max_tokens = 1024;
        config.agent.temperature = Some(0.2);
        let options = completion_options(&config);
        assert_eq!(options.max_tokens, Some(1024));
        assert_eq!(options.temperature, Some(0.2));
        assert!(options.system_prompt.is_none());
    }
}
