//! Command line argument handling with clap v4 and subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Loam - a region-based managed heap for a small dynamic guest language
#[derive(Parser, Debug, Clone)]
#[command(name = "loam")]
#[command(about = "A region-based managed heap for a small dynamic guest language")]
#[command(version)]
pub struct LoamCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Execute a heap-operation script and print its trace
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Script file to execute
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print statistics to stderr before exiting
    #[arg(short = 'S', long = "statistics")]
    pub statistics: bool,

    /// Dump the working set's region layouts after the run
    #[arg(short = 'd', long = "dump-regions")]
    pub dump_regions: bool,
}
