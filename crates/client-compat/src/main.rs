// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use client_logger::{Level, Logger, LoggerConfig, MemoryTokenStore, TokenStore};

/// One line read from stdin.
#[derive(Debug, PartialEq)]
enum Command {
    /// `LEVEL message`, or a bare message logged at info
    Log { level: Level, message: String },
    /// `@source name`, or `@source` alone to go back to the default
    Source(Option<String>),
    /// `@flush`
    Flush,
}

fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "@flush" => return Some(Command::Flush),
        "@source" if rest.is_empty() => return Some(Command::Source(None)),
        "@source" => return Some(Command::Source(Some(rest.to_string()))),
        _ => {}
    }

    match head.parse::<Level>() {
        Ok(level) if !rest.is_empty() => Some(Command::Log {
            level,
            message: rest.to_string(),
        }),
        Ok(_) => None,
        Err(_) => Some(Command::Log {
            level: Level::Info,
            message: line.to_string(),
        }),
    }
}

fn apply(logger: &Logger, command: Command) -> bool {
    match command {
        Command::Log { level, message } => {
            logger.log(level, message, None);
            false
        }
        Command::Source(Some(source)) => {
            logger.set_source(source);
            false
        }
        Command::Source(None) => {
            logger.clear_source();
            false
        }
        Command::Flush => true,
    }
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = LoggerConfig::from_env().context("invalid logger configuration")?;

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", config.log_level);
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).context("could not parse log level in configuration")?,
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    debug!("Logging subsystem enabled");

    let token_store = config
        .token
        .clone()
        .map(|token| MemoryTokenStore::new(Some(token)) as Arc<dyn TokenStore>);
    let logger = Logger::start_http(&config, token_store).context("failed to build log shipper")?;
    info!("Relaying stdin to {}", config.batch_url());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(command) = parse_line(&line) {
                        if apply(&logger, command) {
                            logger.flush().await;
                        }
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    if let Err(e) = logger.shutdown().await {
        error!("Logger shutdown failed: {e}");
    }
    Ok(())
}
