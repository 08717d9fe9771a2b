//! mcpbot command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use mcpbot_agent::LoopController;
use mcpbot_config::{self, Config, ProviderKind, ResolvedProvider};
use mcpbot_host::{LaunchSpec, McpClient, ToolHost};
use mcpbot_provider::{CompletionClient, OllamaClient, OpenAiCompatibleClient};

/// Build the completion client for the configured provider
fn build_client(provider: &ResolvedProvider, config: &Config) -> Arc<dyn CompletionClient> {
    let agent = &config.agent;
    match provider.kind {
        ProviderKind::OpenAi => Arc::new(
            OpenAiCompatibleClient::new(
                provider.api_key.clone().unwrap_or_default(),
                provider.api_base.as_str(),
                provider.model.as_str(),
            )
            .with_max_tokens(agent.max_tokens)
            .with_temperature(agent.temperature),
        ),
        ProviderKind::Ollama => Arc::new(
            OllamaClient::new(provider.api_base.as_str(), provider.model.as_str())
                .with_max_tokens(agent.max_tokens)
                .with_temperature(agent.temperature),
        ),
    }
}

/// Connect to the server and chat until `quit` or end of input
pub async fn chat_command(server: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    mcpbot_config::load_dotenv();

    let config = match &config_path {
        Some(path) => Config::load_with_env(path).await?,
        None => Config::load().await?,
    };
    let provider = config.validate().context("Invalid configuration")?;
    let spec = LaunchSpec::from_path(&server)?;
    let client = build_client(&provider, &config);
    info!(
        "Using {} model {} at {}",
        client.name(),
        client.model(),
        provider.api_base
    );

    let host = Arc::new(
        McpClient::connect(&spec)
            .await
            .context("Failed to connect to the tool server")?,
    );

    let tools = host.list_tools().await?;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    println!("\nConnected to server with tools: {:?}", names);

    let mut controller = LoopController::new(client, host.clone())
        .with_max_iterations(config.max_iterations());
    if let Some(prompt) = &config.agent.system_prompt {
        controller = controller.with_system_prompt(prompt.as_str());
    }

    chat_loop(&controller).await?;

    drop(controller);
    if let Ok(host) = Arc::try_unwrap(host) {
        host.shutdown().await;
    }
    Ok(())
}

async fn chat_loop(controller: &LoopController) -> Result<()> {
    println!("\nMCP Client Started!");
    println!("Type your queries or 'quit' to exit.");

    let mut stdin = BufReader::new(tokio::io::stdin());

    loop {
        print!("\nQuery: ");
        if let Err(e) = std::io::stdout().flush() {
            warn!("Failed to flush stdout: {}", e);
        }

        let Some(line) = read_query(&mut stdin).await else {
            debug!("End of input");
            break;
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        let outcome = controller.process_query(query).await;
        println!("\n{}", outcome.into_text());
    }

    Ok(())
}

/// Next input line, decoded lossily so stray bytes never end the session.
/// `None` at end of input or when stdin can no longer be read.
async fn read_query<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => {
            warn!("Failed to read input: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_query_decodes_invalid_utf8() {
        let mut input: &[u8] = b"caf\xe9 pods\nsecond\n";
        let first = read_query(&mut input).await.unwrap();
        assert_eq!(first.trim(), "caf\u{fffd} pods");
        assert_eq!(read_query(&mut input).await.unwrap(), "second\n");
        assert!(read_query(&mut input).await.is_none());
    }

    #[tokio::test]
    async fn test_read_query_last_line_without_newline() {
        let mut input: &[u8] = b"quit";
        assert_eq!(read_query(&mut input).await.unwrap(), "quit");
        assert!(read_query(&mut input).await.is_none());
    }
}
