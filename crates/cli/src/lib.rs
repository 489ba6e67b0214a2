pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use planshift_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "planshift",
    about = "Planshift plan-change pricing calculator",
    long_about = "Evaluate plan-change quotes, edit the stored scenario, export proposals, \
                  and inspect store readiness.",
    after_help = "Examples:\n  planshift scenario set new_headcount 45\n  planshift quote\n  \
                  planshift export --output-dir proposals"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Evaluate the stored scenario and print every figure")]
    Quote,
    #[command(about = "Inspect, edit, or discard the stored scenario")]
    Scenario {
        #[command(subcommand)]
        action: ScenarioAction,
    },
    #[command(about = "Apply or remove the typed annual manual credit")]
    Credit {
        #[command(subcommand)]
        action: CreditAction,
    },
    #[command(about = "Build the proposal export record")]
    Export {
        #[arg(long, help = "Proposal date (YYYY-MM-DD); defaults to today")]
        date: Option<NaiveDate>,
        #[arg(long, help = "Also write `{file_base}.json` into this directory")]
        output_dir: Option<PathBuf>,
    },
    #[command(about = "Unlock the calculator with the shared access PIN")]
    Unlock { pin: String },
    #[command(about = "Lock the calculator again")]
    Lock,
    #[command(about = "Apply pending store migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, rate card, and store readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ScenarioAction {
    Show,
    /// Set a dotted field path, e.g. `modules.virtual_clock.quantity 12`.
    Set {
        path: String,
        value: String,
    },
    Reset,
}

#[derive(Debug, Subcommand)]
enum CreditAction {
    Apply,
    Remove,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Quote => commands::quote::run(),
        Command::Scenario { action } => match action {
            ScenarioAction::Show => commands::scenario::show(),
            ScenarioAction::Set { path, value } => commands::scenario::set(&path, &value),
            ScenarioAction::Reset => commands::scenario::reset(),
        },
        Command::Credit { action } => match action {
            CreditAction::Apply => commands::credit::apply(),
            CreditAction::Remove => commands::credit::remove(),
        },
        Command::Export { date, output_dir } => {
            commands::export::run(date, output_dir.as_deref())
        }
        Command::Unlock { pin } => commands::access::unlock(&pin),
        Command::Lock => commands::access::lock(),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON envelope.
fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
