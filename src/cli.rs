use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fitscols")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract columns from large FITS binary tables")]
#[command(
    long_about = "FitsCols copies a named subset of columns from a large FITS binary table \
                       into a new FITS file, preserving table metadata, using memory-mapped \
                       reads and chunked writes to bound peak memory."
)]
#[command(after_help = "EXAMPLES:\n  \
    fitscols catalog.fits subset.fits --columns RA,DEC,photo_z,MASS_BEST\n  \
    fitscols catalog.fits subset.fits -c RA,DEC --chunk-size 50000\n  \
    fitscols catalog.fits --list-columns\n  \
    fitscols catalog.fits subset.fits -c RA,DEC --output-format json --quiet\n\n\
    For more information, visit: https://github.com/user/fitscols")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input FITS file containing a binary table extension
    #[arg(required_unless_present = "generate_config")]
    pub input: Option<PathBuf>,

    /// Output FITS file (overwritten if it exists)
    #[arg(required_unless_present_any = ["list_columns", "generate_config"])]
    pub output: Option<PathBuf>,

    /// Column names to extract (comma-separated, order preserved)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required_unless_present_any = ["list_columns", "generate_config"]
    )]
    pub columns: Vec<String>,

    /// Rows processed per write batch
    #[arg(long, value_parser = parse_chunk_size, help = "Rows copied per chunk (default: 100000)")]
    pub chunk_size: Option<usize>,

    /// Extension index to read instead of the first binary table
    #[arg(long, help = "HDU index of the table (default: first BINTABLE)")]
    pub hdu: Option<usize>,

    /// Configuration file path
    #[arg(long, env = "FITSCOLS_CONFIG", help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (validate and show the plan without writing anything)
    #[arg(long, help = "Show what would be extracted without actually doing it")]
    pub dry_run: bool,

    /// List the source table's columns and exit
    #[arg(long, help = "List available columns in the input table")]
    pub list_columns: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let progress = if self.no_progress || self.quiet {
            Some(false)
        } else {
            None
        };

        CliOverrides::new()
            .with_chunk_size(self.chunk_size)
            .with_hdu(self.hdu)
            .with_progress(progress)
    }

    /// Requested column names with surrounding whitespace stripped.
    /// Blank entries are dropped; an all-blank request surfaces later
    /// as an empty-column-list error.
    pub fn requested_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_chunk_size(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid chunk size: {}", s))?;

    if value == 0 {
        return Err("Chunk size must be at least 1 row".to_string());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_cli() -> Cli {
        Cli {
            input: Some(PathBuf::from("catalog.fits")),
            output: Some(PathBuf::from("subset.fits")),
            columns: vec!["RA".to_string(), " DEC".to_string()],
            chunk_size: None,
            hdu: None,
            config: None,
            output_format: OutputFormat::Human,
            no_progress: false,
            verbose: 0,
            quiet: false,
            dry_run: false,
            list_columns: false,
            generate_config: false,
        }
    }

    #[test]
    fn test_parse_chunk_size() {
        assert_eq!(parse_chunk_size("100000").unwrap(), 100000);
        assert_eq!(parse_chunk_size(" 1 ").unwrap(), 1);

        assert!(parse_chunk_size("0").is_err());
        assert!(parse_chunk_size("-5").is_err());
        assert!(parse_chunk_size("lots").is_err());
    }

    #[test]
    fn test_requested_columns_are_trimmed() {
        let cli = basic_cli();
        assert_eq!(cli.requested_columns(), vec!["RA", "DEC"]);
    }

    #[test]
    fn test_blank_columns_dropped() {
        let mut cli = basic_cli();
        cli.columns = vec!["  ".to_string(), "".to_string()];
        assert!(cli.requested_columns().is_empty());
    }

    #[test]
    fn test_quiet_disables_progress_override() {
        let mut cli = basic_cli();
        cli.quiet = true;
        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.progress, Some(false));
    }

    #[test]
    fn test_verbosity_level() {
        let mut cli = basic_cli();
        cli.verbose = 2;
        assert_eq!(cli.verbosity_level(), 2);

        cli.quiet = true;
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_cli_parses_comma_separated_columns() {
        let cli = Cli::parse_from([
            "fitscols",
            "in.fits",
            "out.fits",
            "--columns",
            "RA,DEC,photo_z",
        ]);
        assert_eq!(cli.columns, vec!["RA", "DEC", "photo_z"]);
    }

    #[test]
    fn test_list_columns_needs_no_output() {
        let cli = Cli::parse_from(["fitscols", "in.fits", "--list-columns"]);
        assert!(cli.list_columns);
        assert!(cli.output.is_none());
        assert!(cli.columns.is_empty());
    }
}
