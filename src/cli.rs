use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::output::OutputKind;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Jsonl,
    Csv,
}

impl From<OutputFormat> for OutputKind {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => OutputKind::Text,
            OutputFormat::Jsonl => OutputKind::Jsonl,
            OutputFormat::Csv => OutputKind::Csv,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Browser to read (overrides default_browser from the config)
    #[arg(short, long)]
    pub browser: Option<String>,

    /// Maximum number of history entries to read
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    /// Only show entries whose title or url contains this text
    #[arg(short, long)]
    pub query: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Roaming profile root (defaults to APPDATA)
    #[arg(long)]
    pub roaming_root: Option<PathBuf>,

    /// Local profile root (defaults to LOCALAPPDATA)
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// Directory for temporary database copies
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Print the known browser ids and exit
    #[arg(long)]
    pub list_browsers: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
