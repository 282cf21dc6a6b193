pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scudo_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing::Level;

use commands::{CommandResult, EXIT_INPUT_OR_CONFIG};

#[derive(Debug, Parser)]
#[command(
    name = "scudo",
    about = "Scudo customer-analytics operator CLI",
    long_about = "Produce daily customer briefings, KPI summaries and segment overviews from exported customer data.",
    after_help = "Examples:\n  scudo briefing --input customers.json\n  cat export.json | scudo kpis\n  scudo tool calculate_rfm_scores --input tables.json\n  scudo config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a scudo.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Analyze a customer payload and print the daily briefing JSON")]
    Briefing {
        #[arg(long, help = "Payload file; reads stdin when omitted")]
        input: Option<PathBuf>,
    },
    #[command(about = "Print customer KPIs for a payload")]
    Kpis {
        #[arg(long, help = "Payload file; reads stdin when omitted")]
        input: Option<PathBuf>,
    },
    #[command(about = "Print the per-segment overview for a payload")]
    Segments {
        #[arg(long, help = "Payload file; reads stdin when omitted")]
        input: Option<PathBuf>,
    },
    #[command(about = "Run one assistant tool against tables loaded from a JSON file")]
    Tool {
        name: String,
        #[arg(long, help = "JSON object of table name to rows; reads stdin when omitted")]
        input: Option<PathBuf>,
        #[arg(long, help = "Tool arguments as a JSON object")]
        args: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    // a subscriber may already be installed when embedded
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(cli: Cli) -> CommandResult {
    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides { log_level: cli.log_level, ..ConfigOverrides::default() },
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_INPUT_OR_CONFIG,
            )
        }
    };
    init_logging(&config);

    match cli.command {
        Command::Briefing { input } => commands::briefing::run(&config, input.as_deref()),
        Command::Kpis { input } => commands::kpis::run(input.as_deref()),
        Command::Segments { input } => commands::segments::run(input.as_deref()),
        Command::Tool { name, input, args } => {
            commands::tool::run(&config, &name, input.as_deref(), args.as_deref())
        }
        Command::Config => CommandResult {
            exit_code: 0,
            output: commands::config::run(&config, cli.config.as_deref()),
        },
    }
}
