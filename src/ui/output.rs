use crate::error::{FitsColsError, UserFriendlyError};
use crate::extractor::{ColumnInfo, ExtractionReport};
use console::{style, Emoji, StyledObject, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

/// Message classes routed through a single emit path. Errors are never
/// suppressed; everything else honors quiet and verbosity.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Success,
    Error,
    Warning,
    Info,
    Debug,
    Operation,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Success => "SUCCESS",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Operation => "STARTING",
        }
    }

    fn json_kind(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Operation => "operation_start",
        }
    }

    fn emoji(self) -> Emoji<'static, 'static> {
        match self {
            Level::Success => Emoji("✅ ", "✓ "),
            Level::Error => Emoji("❌ ", "✗ "),
            Level::Warning => Emoji("⚠️  ", "! "),
            Level::Info => Emoji("ℹ️  ", "i "),
            Level::Debug => Emoji("", "  "),
            Level::Operation => Emoji("🚀 ", "> "),
        }
    }

    fn paint(self, text: &str) -> StyledObject<&str> {
        match self {
            Level::Success => style(text).green().bold(),
            Level::Error => style(text).red().bold(),
            Level::Warning => style(text).yellow().bold(),
            Level::Info => style(text).cyan(),
            Level::Debug => style(text).dim(),
            Level::Operation => style(text).bold(),
        }
    }

    fn min_verbosity(self) -> u8 {
        match self {
            Level::Debug => 1,
            _ => 0,
        }
    }
}

pub struct OutputFormatter {
    mode: OutputMode,
    colors: bool,
    verbosity: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let colors = mode == OutputMode::Human
            && !quiet
            && Term::stdout().features().colors_supported();

        Self {
            mode,
            colors,
            verbosity: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    pub fn start_operation(&self, operation: &str) {
        self.emit(Level::Operation, operation);
    }

    pub fn print_user_friendly_error(&self, error: &FitsColsError) {
        self.error(&error.user_message());

        let Some(suggestion) = error.suggestion() else {
            return;
        };
        match self.mode {
            OutputMode::Human => {
                println!();
                let line = format!("Suggestion: {}", suggestion);
                if self.colors {
                    println!("{}{}", Level::Info.emoji(), style(&line).cyan());
                } else {
                    println!("{}", line);
                }
            }
            OutputMode::Json => self.json_line(serde_json::json!({
                "type": "suggestion",
                "message": suggestion,
            })),
            OutputMode::Plain => println!("SUGGESTION: {}", suggestion),
        }
    }

    pub fn print_extraction_report(&self, report: &ExtractionReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => println!(
                "{}",
                serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    /// Listing for --list-columns.
    pub fn print_column_listing(&self, columns: &[ColumnInfo], rows: u64) {
        if self.mode == OutputMode::Json {
            self.json_line(serde_json::json!({
                "type": "column_listing",
                "rows": rows,
                "columns": columns,
            }));
            return;
        }

        println!("Table with {} rows, {} columns:", rows, columns.len());
        let name_width = columns.iter().map(|c| c.name.len()).max().unwrap_or(4).max(4);
        for column in columns {
            println!(
                "  {:<width$}  {:>6} ({} bytes)",
                column.name,
                column.tform,
                column.width,
                width = name_width
            );
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => {
                println!();
                if self.colors {
                    println!("{}{}", Emoji("✨ ", "* "), style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => self.json_line(serde_json::json!({
                "type": "header",
                "title": title,
            })),
            OutputMode::Plain => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }
        if self.colors {
            println!("{}", style("─".repeat(60)).dim());
        } else {
            println!("{}", "-".repeat(60));
        }
    }

    fn suppressed(&self, level: Level) -> bool {
        if level == Level::Error {
            return false;
        }
        self.quiet || self.verbosity < level.min_verbosity()
    }

    fn emit(&self, level: Level, message: &str) {
        if self.suppressed(level) {
            return;
        }

        match self.mode {
            OutputMode::Json => self.json_line(serde_json::json!({
                "type": "message",
                "level": level.json_kind(),
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
            OutputMode::Plain => {
                let line = format!("{}: {}", level.label(), message);
                if level == Level::Error {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
            OutputMode::Human => {
                let line = if self.colors {
                    format!("{}{}", level.emoji(), level.paint(message))
                } else {
                    format!("{}{}", level.emoji(), message)
                };
                if level == Level::Error {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
        }
    }

    fn json_line(&self, obj: serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(&obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_report(&self, report: &ExtractionReport) {
        self.print_header("Extraction Report");

        println!("Source:      {}", report.input);
        println!("Destination: {}", report.output);
        println!(
            "Extracted at: {}",
            report.extraction_time.format("%Y-%m-%d %H:%M UTC")
        );
        println!();

        println!("Columns ({}):", report.columns.len());
        for column in &report.columns {
            println!("  {} ({})", column.name, column.tform);
        }
        println!();
        println!(
            "Rows: {} in {} chunks, {} written in {}",
            report.rows,
            report.chunks,
            format_bytes(report.bytes_written),
            format_duration(report.duration)
        );

        if !report.skipped_keywords.is_empty() {
            println!();
            println!(
                "Header keywords skipped: {}",
                report.skipped_keywords.join(", ")
            );
        }
    }

    fn print_plain_report(&self, report: &ExtractionReport) {
        println!("REPORT: Extraction completed");
        println!("Source: {}", report.input);
        println!("Destination: {}", report.output);
        println!(
            "Columns: {}",
            report
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        println!("Rows: {}", report.rows);
        println!("Bytes: {}", report.bytes_written);
        println!("Duration: {:?}", report.duration);

        if !report.skipped_keywords.is_empty() {
            println!("Skipped keywords: {}", report.skipped_keywords.join(","));
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in ["KB", "MB", "GB"] {
        value /= 1024.0;
        unit = next;
        if value < 1024.0 {
            break;
        }
    }
    format!("{:.1} {}", value, unit)
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => format!("{}ms", duration.as_millis()),
        1..=59 => format!("{}s", secs),
        _ => format!("{}m {}s", secs / 60, secs % 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_suppresses_all_but_errors() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 2, true);
        assert!(formatter.suppressed(Level::Success));
        assert!(formatter.suppressed(Level::Info));
        assert!(formatter.suppressed(Level::Debug));
        assert!(!formatter.suppressed(Level::Error));
    }

    #[test]
    fn test_debug_requires_verbosity() {
        let silent = OutputFormatter::new(OutputMode::Plain, 0, false);
        assert!(silent.suppressed(Level::Debug));
        assert!(!silent.suppressed(Level::Info));

        let verbose = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert!(!verbose.suppressed(Level::Debug));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
