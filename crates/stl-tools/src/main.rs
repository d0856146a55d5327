//! `stltool`: inspect, check and convert STL files.
//!
//! # Commands
//!
//! - `stltool info <file>` - format, name or header, triangle count, bounds
//! - `stltool check <file>` - count degenerate triangles and normal mismatches
//! - `stltool convert <in> <out>` - re-encode, optionally repairing triangles
//!
//! Logging goes to stderr through `env_logger`; `RUST_LOG` overrides the level
//! chosen with `-v`.

mod check;
mod convert;
mod info;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stl_core::StlError;
use thiserror::Error;

/// Failure of a `stltool` command.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Stl(#[from] StlError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Inspect, check and convert STL files
#[derive(Parser)]
#[command(name = "stltool")]
#[command(about = "Inspect, check and convert ASCII and binary STL files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print format, name, triangle count and bounding box
    Info {
        #[arg(name = "FILE")]
        path: PathBuf,
    },

    /// Report degenerate triangles and normal mismatches; exits 1 if any
    Check {
        #[arg(name = "FILE")]
        path: PathBuf,
    },

    /// Re-encode a file
    Convert(convert::ConvertArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(command: Commands) -> Result<ExitCode, ToolError> {
    match command {
        Commands::Info { path } => {
            let info = info::collect(&path)?;
            print!("{info}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { path } => {
            let report = check::run(&path)?;
            print!("{report}");
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Convert(args) => {
            let written = convert::run(&args)?;
            log::info!("{} triangles written to {}", written, args.output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("stltool: {err}");
            ExitCode::from(2)
        }
    }
}
