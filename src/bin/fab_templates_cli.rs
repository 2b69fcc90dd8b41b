//! FAB Templates CLI
//!
//! Commands: fix, check, format
//! Report goes to stdout, logs to stderr
//! Returns 2 when a check finds invalid templates

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fab_templates::{report, Command, FixOptions, TemplateBatch, ENGINE_VERSION};

#[derive(Parser)]
#[command(name = "fab-templates")]
#[command(about = "FAB Templates - normalize and validate template JSON files")]
#[command(version = ENGINE_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to templates directory (defaults to the current directory)
    #[arg(short, long, global = true, env = "FAB_TEMPLATES_DIR")]
    dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fix templates in place and delete unparseable ones
    Fix {
        /// Rename underscore file names to hyphens first
        #[arg(long)]
        normalize_filenames: bool,
    },

    /// Validate templates without modifying them
    Check,

    /// Rewrite templates in canonical formatting
    Format,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Fix { normalize_filenames } => Command::Fix(FixOptions { normalize_filenames }),
            Commands::Check => Command::Check,
            Commands::Format => Command::Format,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let batch = match TemplateBatch::resolve(cli.dir.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "cannot resolve templates directory");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let command = Command::from(cli.command);
    let report = match batch.run(&command) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "batch failed");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match report::to_json(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report::render(&report));
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2) // Invalid templates
    }
}
