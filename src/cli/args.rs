use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorFormat {
    /// Human-readable error messages with terminal graphics.
    #[default]
    Human,
    /// Plain-text error messages without fancy graphics or colors, suitable for screen readers.
    Plain,
    /// Machine-readable JSON output.
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// NLCD land cover class code.
    LandCover,
    /// Soil classification label.
    Soil,
    /// Dates of the land cover observations at the point.
    Dates,
    /// Land cover class code per observation date.
    History,
}

/// A WGS84 position.
#[derive(Args, Clone, Copy, Debug, PartialEq)]
pub struct PointArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Download the dataset if needed, then serve the MCP tools over stdio.
    Serve,
    /// Download and extract the dataset if any expected file is missing.
    Provision,
    /// Look up a single point and print the JSON answer to stdout.
    Query {
        #[arg(value_enum)]
        kind: QueryKind,
        #[clap(flatten)]
        point: PointArgs,
        /// Inclusive lower bound for `history`, YYYY-MM-DD.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Inclusive upper bound for `history`, YYYY-MM-DD.
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Print the configured layers: CRS, size, extent and nodata value.
    Info,
}

/// MCP server answering land cover and soil questions for US locations.
#[derive(Parser, Debug)]
#[clap(name = "landuse-mcp", version)]
pub struct CliArgs {
    /// JSON configuration file (default: built-in NLCD settings).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory holding the dataset files.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value = "human")]
    pub error_format: ErrorFormat,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    pub fn get_error_format(&self) -> ErrorFormat {
        self.error_format
    }

    /// `serve` when no subcommand is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
