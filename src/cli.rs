//! Command-line interface for clusterctl.
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let level = match trimmed.to_ascii_lowercase().as_str() {
            "0" | "off" => LevelFilter::OFF,
            "1" | "error" | "err" => LevelFilter::ERROR,
            "2" | "warn" | "warning" => LevelFilter::WARN,
            "3" | "info" => LevelFilter::INFO,
            "4" | "debug" => LevelFilter::DEBUG,
            "5" | "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}'")),
        };
        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for clusterctl.
#[derive(Parser)]
#[command(name = "clusterctl", version, author)]
#[command(about = "Maintenance orchestration for a distributed storage cluster", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = "clusterctl.yaml")]
    pub config: String,

    /// Report unknown selection names instead of silently dropping them.
    #[arg(long, global = true)]
    pub strict: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Service selection flags shared by the lifecycle commands.
#[derive(Args, Debug, Default, Clone)]
pub struct SelectArgs {
    /// Service name list (defaults to every core service).
    #[arg(long = "services", value_name = "NAME")]
    pub services: Vec<String>,

    /// Service name list to exclude from the selection.
    #[arg(long = "exclude-services", value_name = "NAME")]
    pub exclude_services: Vec<String>,
}

/// Available commands for clusterctl.
#[derive(Subcommand)]
pub enum Commands {
    /// Stop selected services (reverse start order), then run the selected cleanup items.
    Stop {
        #[command(flatten)]
        select: SelectArgs,

        /// Cleanup item name list ("all" for the full catalog).
        #[arg(long = "clean", value_name = "ITEM")]
        clean: Vec<String>,
    },

    /// Start selected services in start order.
    Start {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Stop then start selected services.
    Restart {
        #[command(flatten)]
        select: SelectArgs,

        /// Cleanup item name list run between stop and start.
        #[arg(long = "clean", value_name = "ITEM")]
        clean: Vec<String>,
    },

    /// Run cleanup items without touching service state.
    Cleanup {
        /// Cleanup item name list ("all" for the full catalog).
        #[arg(long = "clean", value_name = "ITEM", required = true)]
        clean: Vec<String>,
    },

    /// Build selected binaries on the build server and stage them locally.
    MakeBinary {
        /// Binary name list (defaults to every deployable binary).
        #[arg(long = "binaries", value_name = "NAME")]
        binaries: Vec<String>,

        /// CI build number for the version tag.
        #[arg(long)]
        build_num: Option<String>,
    },

    /// Tag a release, derive the image reference, and wait for the CI gate.
    MakeImage {
        /// CI build number for the version tag.
        #[arg(long)]
        build_num: Option<String>,
    },

    /// Apply an already-gated image to selected services.
    ApplyImage {
        #[command(flatten)]
        select: SelectArgs,

        /// Image reference of form `registry:tag`.
        #[arg(long)]
        image: String,
    },

    /// Make an image, then stop and re-image the selected services.
    Upgrade {
        #[command(flatten)]
        select: SelectArgs,

        /// CI build number for the version tag.
        #[arg(long)]
        build_num: Option<String>,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
