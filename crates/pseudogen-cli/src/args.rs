use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use pseudogen_core::ini::RULES_FILE_NAME;

#[derive(Parser, Debug)]
#[command(
    name = "pseudogen",
    about = "Build, check and preview synthetic-dataset rule files",
    version,
    after_help = "Examples:\n  pseudogen check rules.ini\n  pseudogen show rules.ini\n  pseudogen preview rules.ini --watch\n  pseudogen generate rules.ini --output final_rules.ini\n  pseudogen upload exported.ini --output rules.ini\n  pseudogen sample rules.ini --seed 42 --output leads.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Generator service URL
    /// Falls back to PSEUDOGEN_SERVER_URL, then pseudogen.toml, then http://localhost:8000
    #[arg(long, env = "PSEUDOGEN_SERVER_URL", global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and validate a rules file
    Check(CheckArgs),

    /// Display a rules file as tables
    Show(ShowArgs),

    /// Rewrite a rules file in canonical form
    Fmt(FmtArgs),

    /// Send a rules file to the generator service for parsing
    Upload(UploadArgs),

    /// Preview rows from the generator service (or locally with --local)
    Preview(PreviewArgs),

    /// Have the generator service build the final rules file
    Generate(GenerateArgs),

    /// Generate a dataset locally with the built-in sample engine
    Sample(SampleArgs),
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Rules file to check
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,

    /// Output format for the report
    #[arg(long, default_value = "text")]
    pub format: CheckFormat,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Rules file to display
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct FmtArgs {
    /// Rules file to format
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,

    /// Write the result here instead of rewriting the file in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only report whether the file is already formatted (exit 1 if not)
    #[arg(long, conflicts_with = "output")]
    pub check: bool,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Rules file to upload (must end in .ini)
    pub file: PathBuf,

    /// Save the service's reading of the file as rules.ini text
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Rules file to preview
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,

    /// Maximum number of rows to request
    #[arg(long)]
    pub rows: Option<u64>,

    /// Re-run the preview whenever the file changes
    #[arg(long)]
    pub watch: bool,

    /// Use the built-in sample engine instead of the service
    #[arg(long)]
    pub local: bool,

    /// Random seed for --local
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Rules file to send
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,

    /// Where to save the returned file (default: rules_<timestamp>.ini)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SampleArgs {
    /// Rules file to generate from
    #[arg(default_value = RULES_FILE_NAME)]
    pub file: PathBuf,

    /// Output file path (.csv or .json). Defaults to output_<timestamp>.csv
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (auto-detected from file extension if not specified)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the record count from [rec] num
    #[arg(long)]
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CheckFormat {
    Text,
    Json,
}

impl SampleArgs {
    /// Determine output format from the explicit flag or the file extension.
    pub fn output_format(&self) -> OutputFormat {
        if let Some(ref fmt) = self.format {
            return fmt.clone();
        }
        match self.output.as_ref().and_then(|p| p.extension()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}
