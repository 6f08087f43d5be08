// SPDX-License-Identifier: MPL-2.0

use anyhow::Result;
use assistant::{AssistantClient, CallOptions, ChatChunk, ChunkAccumulator};
use clap::Parser;
use futures_util::StreamExt;
use promptlens::cli::{build_client, describe_messages, Cli, Commands};
use promptlens::{logging, Config};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_from(&config_path);
    if let Some(model) = &cli.model {
        config.anthropic.model = model.clone();
    }
    logging::init(&config.log_level);

    match cli.command {
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite",
                    config_path.display()
                );
            }
            config.save_to(&config_path)?;
            info!("Wrote {}", config_path.display());
            println!("{}", config_path.display());
        }
        Commands::Format { image, pretty } => {
            let formatted = image.format().await?;
            let json = if pretty {
                serde_json::to_string_pretty(&formatted)?
            } else {
                serde_json::to_string(&formatted)?
            };
            println!("{json}");
        }
        Commands::Describe {
            image,
            question,
            max_tokens,
        } => {
            let formatted = image.format().await?;
            info!("Describing {}", formatted.url);

            let model = build_client(&config.anthropic)?;
            let client = AssistantClient::new(Arc::new(model));
            let messages =
                describe_messages(formatted, &question, config.anthropic.system_prompt.as_deref());
            let options = CallOptions::new()
                .with_max_tokens(max_tokens.unwrap_or(config.anthropic.max_tokens));

            let mut stream = client.stream_messages(&messages, &options).await?;
            let mut acc = ChunkAccumulator::new();
            let mut stdout = std::io::stdout();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if let ChatChunk::TextDelta(text) = &chunk {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                acc.push(&chunk);
            }
            writeln!(stdout)?;

            let response = acc.finish()?;
            if let Some(usage) = response.usage {
                debug!(
                    "Usage: {} input, {} output tokens",
                    usage.input_tokens, usage.output_tokens
                );
            }
        }
    }

    Ok(())
}
