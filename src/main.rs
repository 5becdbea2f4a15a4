// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Charnet CLI - character networks of a novel, phase by phase

use anyhow::Result;
use charnet::commands::{self, export::ExportFormat, Globals, Output, PhaseArgs};
use charnet::types::RowPolicy;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charnet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CHARNET_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Fail the load on the first malformed row instead of skipping it
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the phase catalog
    Phases,

    /// Run a phase and print its metrics and ranked tables
    Metrics {
        #[command(flatten)]
        phase: PhaseArgs,
    },

    /// Write the HTML dashboard for a phase
    Render {
        #[command(flatten)]
        phase: PhaseArgs,

        /// Output file (defaults to report.output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a phase graph
    Export {
        #[command(flatten)]
        phase: PhaseArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Dot)]
        format: ExportFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Launch the interactive terminal dashboard
    View {
        /// Community detection seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Print a single dotted key, e.g. community.seed
        key: Option<String>,

        /// Print the user config file location
        #[arg(long, conflicts_with = "key")]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn init_logging(cli: &Cli) {
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // The terminal dashboard owns the screen; log lines would tear it
    if matches!(cli.command, Commands::View { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, &mut Cli::command());
    }

    let mut config = charnet::config::load(cli.config.as_deref())?;
    if cli.strict {
        config.rows = RowPolicy::Strict;
    }

    let globals = Globals {
        config,
        out: Output {
            json: cli.json,
            color: !cli.no_color,
        },
    };

    match &cli.command {
        Commands::Phases => commands::phases::run(&globals),
        Commands::Metrics { phase } => commands::metrics::run(&globals, phase),
        Commands::Render { phase, output } => {
            commands::render::run(&globals, phase, output.clone())
        }
        Commands::Export {
            phase,
            format,
            output,
        } => commands::export::run(&globals, phase, *format, output.clone()),
        Commands::View { seed } => commands::view::run(&globals, *seed),
        Commands::Config { key, path } => commands::config::run(&globals, key.as_deref(), *path),
        Commands::Completions { .. } => Ok(()),
    }
}
