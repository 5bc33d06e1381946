//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Planframe - compile design plans into scene graphs
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Compile free-form design plans into positioned scene graphs",
    version,
    after_help = "Logs are written to: ~/.local/share/planframe/logs/planframe.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Split a plan into named sections
    Classify {
        /// Plan file, or - for stdin
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Recover JSON from raw model output
    Repair {
        /// Model output file, or - for stdin
        file: PathBuf,

        /// Expect a JSON object instead of an array
        #[arg(long, conflicts_with = "nodes")]
        object: bool,

        /// Decode the result into design nodes
        #[arg(long)]
        nodes: bool,
    },

    /// Validate and store an API key
    Auth {
        /// The API key
        key: String,
    },

    /// Run the full pipeline against an in-memory surface
    Generate {
        /// Plan file, or - for stdin
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "tree")]
        format: OutputFormat,

        /// Font families the surface offers (defaults to every configured family)
        #[arg(long, value_delimiter = ',')]
        fonts: Option<Vec<String>>,
    },

    /// Serve UI requests as JSON lines over stdin/stdout
    Bridge,
}

/// Output format for classify/generate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Tree,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "tree" => Ok(Self::Tree),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text, tree, or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Tree => write!(f, "tree"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Whether a path argument means stdin
pub fn is_stdin(path: &std::path::Path) -> bool {
    path.as_os_str() == "-"
}
