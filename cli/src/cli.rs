use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Terminal chat client for the Trip Agent travel assistant
#[derive(Parser, Debug)]
#[command(name = "trip-agent", author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the Trip Agent API
    #[arg(long, global = true, env = "TRIP_AGENT_API_URL")]
    pub base_url: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TRIP_AGENT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value_t = false)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive chat session (default)
    Chat {
        /// Write the transcript as an HTML page when the session ends
        #[arg(long)]
        transcript_html: Option<PathBuf>,
    },

    /// Ask a single question and print the reply
    Ask {
        /// The travel question to send
        #[arg(required = true)]
        prompt: String,
    },

    /// Check that the Trip Agent API is up
    Health,

    /// Show the API's self-description
    Info,

    /// Gather background information about a travel topic
    AdditionalInfo {
        /// The travel/trip-related query
        #[arg(required = true)]
        query: String,
    },

    /// Show the effective configuration
    Config {
        /// Persist the effective base URL to the configuration file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_is_optional() {
        let args = Args::try_parse_from(["trip-agent"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["trip-agent", "ask", "Venice?", "--base-url", "http://x"])
                .unwrap();
        assert_eq!(args.base_url.as_deref(), Some("http://x"));
        assert!(matches!(args.command, Some(Command::Ask { ref prompt }) if prompt == "Venice?"));
    }

    #[test]
    fn additional_info_requires_query() {
        assert!(Args::try_parse_from(["trip-agent", "additional-info"]).is_err());
    }
}
