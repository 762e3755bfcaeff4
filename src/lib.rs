pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fits;
pub mod ui;

pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractConfig, OutputConfig};
pub use error::{FitsColsError, Result, UserFriendlyError};
pub use extractor::{
    ColumnExtractor, ColumnInfo, ExtractionPlan, ExtractionProgress, ExtractionReport,
    DEFAULT_CHUNK_SIZE,
};
pub use fits::{FitsReader, TableSchema};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;

/// Top-level handle tying together configuration, terminal output,
/// and progress rendering for a sequence of extraction operations.
pub struct FitsCols {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl FitsCols {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(config.output.progress && !quiet);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    /// Build a handle from parsed CLI arguments: config file merged
    /// with flag overrides, output mode and verbosity applied.
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            cli::OutputFormat::Human => OutputMode::Human,
            cli::OutputFormat::Json => OutputMode::Json,
            cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(
            config,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        ))
    }

    /// Extract the requested columns from `input` into `output`,
    /// reporting progress once per chunk.
    pub fn extract(
        &self,
        input: &Path,
        output: &Path,
        columns: &[String],
    ) -> Result<ExtractionReport> {
        self.output_formatter.start_operation(&format!(
            "Extracting {} columns from {}",
            columns.len(),
            input.display()
        ));

        let extractor = self.build_extractor();
        self.output_formatter.debug(&format!(
            "chunk size: {} rows, table HDU: {}",
            self.config.extract.chunk_size,
            self.config
                .extract
                .hdu
                .map(|i| i.to_string())
                .unwrap_or_else(|| "auto".to_string())
        ));

        let row_progress = self.progress_manager.create_row_progress();
        let progress_callback = {
            let pb = row_progress.clone();
            move |progress: &ExtractionProgress| {
                ui::progress::update_row_progress(&pb, progress);
            }
        };

        let result = extractor.extract(input, output, columns, Some(&progress_callback));

        match result {
            Ok(report) => {
                ui::progress::finish_progress_with_summary(
                    &row_progress,
                    &format!("Copied {} rows", report.rows),
                    report.duration,
                );
                self.output_formatter.success(&format!(
                    "Wrote {} columns, {} rows to {}",
                    report.columns.len(),
                    report.rows,
                    output.display()
                ));
                if !report.skipped_keywords.is_empty() {
                    self.output_formatter.warning(&format!(
                        "Skipped {} header keywords: {}",
                        report.skipped_keywords.len(),
                        report.skipped_keywords.join(", ")
                    ));
                }
                Ok(report)
            }
            Err(error) => {
                row_progress.finish_and_clear();
                Err(error)
            }
        }
    }

    /// Validate a request and describe what would be extracted,
    /// without creating any output.
    pub fn preview(&self, input: &Path, columns: &[String]) -> Result<ExtractionPlan> {
        self.build_extractor().preview(input, columns)
    }

    /// Columns available in the input table, plus its row count.
    pub fn list_columns(&self, input: &Path) -> Result<(Vec<ColumnInfo>, u64)> {
        let spinner = self
            .progress_manager
            .create_spinner(&format!("Reading {}", input.display()));
        let result = (|| {
            let reader = FitsReader::open(input)?;
            let schema = reader.table_schema(self.config.extract.hdu)?;
            let columns = schema.columns.iter().map(ColumnInfo::from).collect();
            Ok((columns, schema.nrows))
        })();
        spinner.finish_and_clear();
        result
    }

    fn build_extractor(&self) -> ColumnExtractor {
        ColumnExtractor::new()
            .with_chunk_size(self.config.extract.chunk_size)
            .with_hdu(self.config.extract.hdu)
    }

    /// Write a default configuration file for the user to edit.
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(FitsColsError::Io)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Print an error with its message and suggestion, honoring the
    /// selected output mode.
    pub fn handle_error(&self, error: &FitsColsError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function to extract columns with minimal setup; no
/// progress output, default chunking unless overridden.
pub fn extract_columns(
    input: &Path,
    output: &Path,
    columns: &[String],
    chunk_size: Option<usize>,
) -> Result<ExtractionReport> {
    let extractor = ColumnExtractor::new().with_chunk_size(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE));
    extractor.extract(input, output, columns, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fitscols_creation() {
        let config = Config::default();
        let fitscols = FitsCols::new(config, OutputMode::Human, 1, false);
        assert_eq!(fitscols.config().extract.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(fitscols.progress_manager().is_enabled());
    }

    #[test]
    fn test_quiet_disables_progress() {
        let config = Config::default();
        let fitscols = FitsCols::new(config, OutputMode::Plain, 0, true);
        assert!(!fitscols.progress_manager().is_enabled());
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        FitsCols::generate_sample_config(&config_path).unwrap();
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extract]"));
        assert!(content.contains("[output]"));
    }

}
