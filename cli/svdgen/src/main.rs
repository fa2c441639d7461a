//! svdgen CLI: generate CMSIS-SVD files from vendor device headers.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use svdgen_core::CpuName;

#[derive(Parser)]
#[command(
    name = "svdgen",
    version,
    about = "Generate CMSIS-SVD device descriptions from C headers"
)]
struct Cli {
    /// Log verbosity (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a device description from a header
    Generate {
        /// Device header (e.g., w7500x.h)
        header: PathBuf,
        /// Built-in profile name
        #[arg(long, conflicts_with = "profile_file")]
        profile: Option<String>,
        /// Profile TOML file
        #[arg(long)]
        profile_file: Option<PathBuf>,
        /// Device name (overrides the profile)
        #[arg(long)]
        name: Option<String>,
        /// Processor core (overrides the profile)
        #[arg(long)]
        cpu: Option<CpuName>,
        /// Report every error instead of stopping at the first
        #[arg(long)]
        collect_errors: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Svd)]
        format: OutputFormat,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Inspect and check extraction profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List built-in profiles
    List,
    /// Print a built-in profile
    Describe {
        /// Profile name
        name: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = ProfileFormat::Toml)]
        format: ProfileFormat,
    },
    /// Load and validate a profile file
    Validate {
        /// Profile TOML file
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Svd,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileFormat {
    Toml,
    Json,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            header,
            profile,
            profile_file,
            name,
            cpu,
            collect_errors,
            format,
            output,
        } => {
            let options = commands::generate::Options {
                profile: profile.as_deref(),
                profile_file: profile_file.as_deref(),
                name: name.as_deref(),
                cpu,
                collect_errors,
                format,
            };
            commands::generate::run(&header, &options, output.as_deref())
        }

        Commands::Profile { action } => match action {
            ProfileAction::List => commands::profile::list(),
            ProfileAction::Describe { name, format } => commands::profile::describe(&name, format),
            ProfileAction::Validate { path } => commands::profile::validate(&path),
        },
    }
}
