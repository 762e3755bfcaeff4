use clap::Parser;
use fitscols::{
    Cli, FitsCols, FitsColsError, OutputFormatter, OutputMode, UserFriendlyError,
};
use std::path::Path;
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    // Commands that need no FITS input
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let fitscols = match FitsCols::from_cli(&cli) {
        Ok(fitscols) => fitscols,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let Some(input) = cli.input.as_deref() else {
        fitscols.output_formatter().error("No input file given");
        return 2;
    };

    if cli.list_columns {
        return handle_list_columns(&fitscols, input);
    }

    let Some(output) = cli.output.as_deref() else {
        fitscols.output_formatter().error("No output file given");
        return 2;
    };

    let columns = cli.requested_columns();

    if cli.dry_run {
        return handle_dry_run(&fitscols, input, output, &columns);
    }

    match fitscols.extract(input, output, &columns) {
        Ok(report) => {
            fitscols.output_formatter().print_extraction_report(&report);
            0
        }
        Err(e) => {
            fitscols.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &FitsColsError) -> i32 {
    match error {
        FitsColsError::EmptyColumnList => 2,
        FitsColsError::InvalidChunkSize { .. } => 2,
        FitsColsError::Config { .. } => 2,
        FitsColsError::MissingColumns { .. } => 3,
        FitsColsError::NoTableExtension { .. } => 4,
        FitsColsError::Format { .. } => 5,
        FitsColsError::UnsupportedColumn { .. } => 6,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "fitscols.toml".to_string());

    match FitsCols::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  fitscols <input> <output> -c COL1,COL2 --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_list_columns(fitscols: &FitsCols, input: &Path) -> i32 {
    match fitscols.list_columns(input) {
        Ok((columns, rows)) => {
            fitscols.output_formatter().print_column_listing(&columns, rows);
            0
        }
        Err(e) => {
            fitscols.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn handle_dry_run(fitscols: &FitsCols, input: &Path, output: &Path, columns: &[String]) -> i32 {
    let formatter = fitscols.output_formatter();

    formatter.info("DRY RUN MODE - No files will be written");
    formatter.print_separator();

    let plan = match fitscols.preview(input, columns) {
        Ok(plan) => plan,
        Err(e) => {
            fitscols.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    formatter.info("Extraction plan:");
    println!("  Source:      {}", input.display());
    println!("  Destination: {} (would be overwritten)", output.display());
    println!("  Rows:        {}", plan.rows);
    println!(
        "  Chunks:      {} of up to {} rows",
        plan.chunks,
        fitscols.config().extract.chunk_size
    );
    println!("  Row stride:  {} bytes", plan.row_stride);
    println!("  Columns:");
    for column in &plan.columns {
        println!("    {} ({})", column.name, column.tform);
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform actual extraction");

    0
}

fn print_startup_error(error: &FitsColsError) {
    // Errors raised before a formatter exists get a plain human one.
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli {
            input: None,
            output: None,
            columns: vec![],
            chunk_size: None,
            hdu: None,
            config: Some(config_path.clone()),
            output_format: fitscols::cli::OutputFormat::Human,
            no_progress: false,
            verbose: 0,
            quiet: false,
            dry_run: false,
            list_columns: false,
            generate_config: true,
        };

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extract]"));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        assert_eq!(
            exit_code_for(&FitsColsError::MissingColumns {
                names: vec!["X".into()]
            }),
            3
        );
        assert_eq!(exit_code_for(&FitsColsError::EmptyColumnList), 2);
        assert_eq!(
            exit_code_for(&FitsColsError::NoTableExtension {
                path: "f.fits".into()
            }),
            4
        );
        assert_eq!(
            exit_code_for(&FitsColsError::Format {
                message: "bad".into()
            }),
            5
        );
        assert_eq!(
            exit_code_for(&FitsColsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "io"
            ))),
            1
        );
    }
}
