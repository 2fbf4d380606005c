use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use wolfybot::{channels, util, Config};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("WOLFYBOT_GIT_SHA"),
    ", built ",
    env!("WOLFYBOT_BUILD_TIME"),
    ")"
);

/// Slack bot answering questions via Wit.ai and Wolfram|Alpha.
#[derive(Parser, Debug)]
#[command(name = "wolfybot", version, long_version = LONG_VERSION)]
struct Cli {
    /// Path to config.toml (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Slack and answer messages
    Start,
    /// Answer one message locally and print the reply
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check Slack, Wit.ai and Wolfram|Alpha connectivity
    Doctor,
    /// Print the effective configuration with secrets masked
    ShowConfig,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn print_config(config: &Config) {
    println!("[slack]");
    println!("  bot_token          = {}", util::redact(&config.slack.bot_token));
    println!("  api_base_url       = {}", config.slack.api_base_url);
    println!("  ping_interval_secs = {}", config.slack.ping_interval_secs);
    println!("[wit]");
    println!("  access_token       = {}", util::redact(&config.wit.access_token));
    println!("  api_base_url       = {}", config.wit.api_base_url);
    println!("  api_version        = {}", config.wit.api_version);
    println!("[wolfram]");
    println!("  app_id             = {}", util::redact(&config.wolfram.app_id));
    println!("  api_base_url       = {}", config.wolfram.api_base_url);
    println!("  units              = {}", config.wolfram.units.as_str());
    println!("  timeout_secs       = {}", config.wolfram.timeout_secs);
    println!("[bot]");
    println!("  confidence_threshold   = {}", config.bot.confidence_threshold);
    println!("  request_timeout_secs   = {}", config.bot.request_timeout_secs);
    println!("  max_in_flight_messages = {}", config.bot.max_in_flight_messages);
    println!(
        "  backoff_secs           = {}..{}",
        config.bot.initial_backoff_secs, config.bot.max_backoff_secs
    );
    println!("[gateway]");
    println!("  enabled            = {}", config.gateway.enabled);
    println!("  bind               = {}", config.gateway.bind);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Start => channels::start_channels(config).await,
        Commands::Ask { text } => {
            let (intent, reply) = channels::ask_once(&config, &text.join(" ")).await?;
            tracing::info!("Intent: {}", intent.label());
            println!("{reply}");
            Ok(())
        }
        Commands::Doctor => channels::doctor_channels(config).await,
        Commands::ShowConfig => {
            print_config(&config);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::try_parse_from(["wolfybot", "-v", "ask", "what", "is", "pi"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ask { text } => assert_eq!(text.join(" "), "what is pi"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ask_requires_text() {
        assert!(Cli::try_parse_from(["wolfybot", "ask"]).is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["wolfybot", "start", "--config", "~/bot.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("~/bot.toml"));
        assert!(matches!(cli.command, Commands::Start));
    }
}
