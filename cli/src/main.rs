use anyhow::{Context, Result};
use clap::Parser;
use trip_agent_core::config::{get_default_config_file, TripAgentConfig, APP_NAME};
use trip_agent_core::TripAgentClient;

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::{Args, Command};
use crate::logging::{filter_directive, report_error};
use crate::output::TerminalRenderer;

/// Main function - Talks to the Trip Agent API
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so clap sees its variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME).context("Failed to locate config file")?,
    };

    // Logging is not up yet, so a bad config file is reported after init
    let (file_config, config_error) = match TripAgentConfig::load_from_file(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (TripAgentConfig::default(), Some(e)),
    };

    let overrides = TripAgentConfig {
        base_url: args.base_url.clone(),
        log_level: args.log_level.clone(),
        ..TripAgentConfig::default()
    };
    let config = file_config
        .merge(&TripAgentConfig::from_env())
        .merge(&overrides);

    logging::init(&filter_directive(
        args.log_level.as_deref(),
        args.verbose,
        config.log_level.as_deref(),
    ));

    if let Some(e) = config_error {
        report_error(&format!("{} ({}); using defaults", e, config_path.display()));
    }

    if args.no_color {
        colored::control::set_override(false);
    }

    let command = args.command.unwrap_or(Command::Chat {
        transcript_html: None,
    });

    if let Command::Config { save } = command {
        return app::show_config(&config, &config_path, save);
    }

    let client = TripAgentClient::new(&config).context("Failed to initialize Trip Agent client")?;
    tracing::debug!("Using Trip Agent API at {}", client.base_url());

    let renderer = TerminalRenderer::new(config.syntax_theme.as_deref());
    let welcome = config.resolved_welcome_message();

    let result = match command {
        Command::Chat { transcript_html } => {
            app::run_interactive_chat(&client, &renderer, welcome, transcript_html).await
        }
        Command::Ask { prompt } => app::run_single_query(&prompt, &client, &renderer, welcome).await,
        Command::Health => app::run_health(&client).await,
        Command::Info => app::run_info(&client).await,
        Command::AdditionalInfo { query } => {
            app::run_additional_info(&query, &client, &renderer).await
        }
        Command::Config { .. } => Ok(()),
    };

    if let Err(e) = &result {
        report_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
