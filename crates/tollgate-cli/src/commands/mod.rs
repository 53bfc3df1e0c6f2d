//! CLI commands and argument parsing.

pub mod compile;

use clap::{Parser, Subcommand};

/// Tollgate - compiles class-based policy definitions into gateway policies
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compile policy sources into XML documents
    Compile(compile::CompileArgs),

    /// Print version information
    Version,
}
