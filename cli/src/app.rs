use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use trip_agent_core::render::html::render_transcript;
use trip_agent_core::render::parse_markdown;
use trip_agent_core::{
    AdditionalInfoRequest, Rendered, Session, SubmitError, TripAgentConfig, TripApi,
};

use crate::output::{print_health, TerminalRenderer};

const WAITING_MESSAGE: &str = "Gathering information and generating response...";

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Reads stdin on a plain thread, one line per request, so nothing is read
/// while a turn is outstanding and a blocked read never holds up shutdown.
struct LineReader {
    ask: std_mpsc::Sender<()>,
    lines: mpsc::Receiver<io::Result<Option<String>>>,
}

impl LineReader {
    fn spawn() -> Self {
        let (ask, asked) = std_mpsc::channel::<()>();
        let (tx, lines) = mpsc::channel(1);
        thread::spawn(move || {
            while asked.recv().is_ok() {
                let mut input = String::new();
                let line = io::stdin()
                    .read_line(&mut input)
                    .map(|n| (n > 0).then_some(input));
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self { ask, lines }
    }

    /// Next line without its line terminator; `None` at end of input.
    async fn next_line(&mut self) -> Result<Option<String>> {
        self.ask.send(()).context("Input reader stopped")?;
        let line = self
            .lines
            .recv()
            .await
            .context("Input reader stopped")?
            .context("Failed to read input")?;
        Ok(line.map(|l| l.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Runs an interactive chat session against the Trip Agent API
pub async fn run_interactive_chat(
    api: &dyn TripApi,
    renderer: &TerminalRenderer,
    welcome: &str,
    transcript_html: Option<PathBuf>,
) -> Result<()> {
    let mut session = Session::new(welcome);
    info!("Starting chat session {}", session.id());

    if let Some(welcome) = session.last() {
        renderer.print_message(welcome);
    }
    println!("Type 'exit' or 'quit' to end the session.");
    println!();

    let mut reader = LineReader::spawn();
    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let input = tokio::select! {
            line = reader.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(input) = input else {
            println!("Exiting chat session.");
            break;
        };

        let command = input.trim();
        if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
            println!("Exiting chat session.");
            break;
        }

        let turn = match session.begin(&input) {
            Ok(turn) => turn,
            Err(SubmitError::EmptyInput) => continue,
            Err(e) => {
                warn!("Submission refused: {}", e);
                continue;
            }
        };

        let spinner = spinner(WAITING_MESSAGE)?;
        debug!("Sending query: {}", turn.query());
        let outcome = tokio::select! {
            outcome = api.generate_final_response(turn.request()) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        spinner.finish_and_clear();

        match outcome {
            Some(outcome) => {
                if let Some(reply) = session.complete(turn, outcome) {
                    renderer.print_message(reply);
                }
            }
            None => {
                session.abandon(turn);
                println!("Interrupted. Exiting chat session.");
                break;
            }
        }

        println!();
    }

    if let Some(path) = transcript_html {
        write_transcript(&session, &path)?;
        println!("Transcript written to {}", path.display());
    }

    Ok(())
}

fn write_transcript(session: &Session, path: &Path) -> Result<()> {
    let html = render_transcript("Trip Agent", session.transcript());
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write transcript to {}", path.display()))
}

/// Sends one question and prints the exchange
pub async fn run_single_query(
    prompt: &str,
    api: &dyn TripApi,
    renderer: &TerminalRenderer,
    welcome: &str,
) -> Result<()> {
    info!("Running single query: {}", prompt);

    let mut session = Session::new(welcome);
    let spinner = spinner(WAITING_MESSAGE)?;
    let outcome = session.submit(api, prompt).await.map(|_| ());
    spinner.finish_and_clear();

    if let Err(e) = outcome {
        anyhow::bail!("Cannot send message: {}", e);
    }
    // Everything after the welcome message
    for message in session.transcript().iter().skip(1) {
        renderer.print_message(message);
    }
    Ok(())
}

pub async fn run_health(api: &dyn TripApi) -> Result<()> {
    let health = api
        .check_health()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Health check failed")?;
    print_health(&health);
    Ok(())
}

pub async fn run_info(api: &dyn TripApi) -> Result<()> {
    let info = api
        .get_api_info()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to fetch API info")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&info).context("Failed to format API info")?
    );
    Ok(())
}

pub async fn run_additional_info(
    query: &str,
    api: &dyn TripApi,
    renderer: &TerminalRenderer,
) -> Result<()> {
    let spinner = spinner("Gathering information...")?;
    let outcome = api
        .gather_additional_info(AdditionalInfoRequest::new(query))
        .await;
    spinner.finish_and_clear();

    let info = outcome
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to gather additional information")?;
    println!("{}", renderer.render(&Rendered::Markdown(parse_markdown(&info.info))));
    Ok(())
}

/// Prints the effective configuration and optionally persists it.
pub fn show_config(config: &TripAgentConfig, path: &Path, save: bool) -> Result<()> {
    println!("{} {}", "Config file:".cyan().bold(), path.display());
    println!("{} {}", "API URL:".cyan().bold(), config.resolved_base_url());
    println!(
        "{} {}",
        "Log level:".cyan().bold(),
        config.log_level.as_deref().unwrap_or("(default)")
    );
    println!(
        "{} {}",
        "Syntax theme:".cyan().bold(),
        config.syntax_theme.as_deref().unwrap_or("(default)")
    );
    println!(
        "{} {}",
        "Welcome message:".cyan().bold(),
        config.resolved_welcome_message()
    );

    if save {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to save config to {}", path.display()))?;
        println!("Configuration saved.");
    }
    Ok(())
}
