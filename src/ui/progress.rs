use crate::extractor::ExtractionProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    /// Single updating line showing the percentage of rows copied.
    pub fn create_row_progress(&self) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Copying rows...");
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Update the row bar from a per-chunk progress report. The bar length
/// is set from the report since the row count is only known once the
/// source table has been opened.
pub fn update_row_progress(pb: &ProgressBar, progress: &ExtractionProgress) {
    let target_len = progress.total_rows.max(1);
    if pb.length() != Some(target_len) {
        pb.set_length(target_len);
    }
    if progress.total_rows == 0 {
        pb.set_position(1);
    } else {
        pb.set_position(progress.rows_processed);
    }

    if progress.rows_processed > 0 && progress.rows_processed < progress.total_rows {
        let remaining = progress.estimated_remaining();
        if remaining.as_secs() > 0 {
            pb.set_message(format!(
                "{}/{} rows (ETA: {})",
                progress.rows_processed,
                progress.total_rows,
                format_duration(remaining)
            ));
            return;
        }
    }
    pb.set_message(format!(
        "{}/{} rows",
        progress.rows_processed, progress.total_rows
    ));
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
