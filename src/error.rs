use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitsColsError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Columns not found in table: {}", names.join(", "))]
    MissingColumns { names: Vec<String> },

    #[error("No columns requested")]
    EmptyColumnList,

    #[error("Column {name} has variable-length format {tform} and cannot be extracted")]
    UnsupportedColumn { name: String, tform: String },

    #[error("No binary table extension found in {path}")]
    NoTableExtension { path: String },

    #[error("Malformed FITS file: {message}")]
    Format { message: String },

    #[error("Invalid chunk size: {value} (must be at least 1)")]
    InvalidChunkSize { value: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FitsColsError {
    fn user_message(&self) -> String {
        match self {
            FitsColsError::MissingColumns { names } => {
                format!("Columns not found in table: {}", names.join(", "))
            }
            FitsColsError::EmptyColumnList => "No columns requested".to_string(),
            FitsColsError::UnsupportedColumn { name, tform } => {
                format!(
                    "Column {} uses variable-length format {} and cannot be extracted",
                    name, tform
                )
            }
            FitsColsError::NoTableExtension { path } => {
                format!("No binary table extension found in {}", path)
            }
            FitsColsError::Format { message } => {
                format!("Malformed FITS file: {}", message)
            }
            FitsColsError::InvalidChunkSize { value } => {
                format!("Invalid chunk size: {}", value)
            }
            FitsColsError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            FitsColsError::MissingColumns { .. } => Some(
                "Run with --list-columns to see the column names available in the source table."
                    .to_string(),
            ),
            FitsColsError::EmptyColumnList => Some(
                "Pass at least one column name with --columns (e.g., --columns RA,DEC)."
                    .to_string(),
            ),
            FitsColsError::UnsupportedColumn { .. } => Some(
                "Variable-length array columns (TFORM P/Q) reference a data heap that is not \
                 copied. Remove the column from the request."
                    .to_string(),
            ),
            FitsColsError::NoTableExtension { .. } => Some(
                "Check that the input is a FITS file with a BINTABLE extension, or select a \
                 specific extension with --hdu."
                    .to_string(),
            ),
            FitsColsError::Format { .. } => Some(
                "The file does not follow the FITS standard. Verify it was not truncated during \
                 download."
                    .to_string(),
            ),
            FitsColsError::InvalidChunkSize { .. } => {
                Some("Use a chunk size of at least 1 row (default: 100000).".to_string())
            }
            FitsColsError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FitsColsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_names_all_absentees() {
        let error = FitsColsError::MissingColumns {
            names: vec!["NOT_A_COLUMN".to_string(), "ALSO_MISSING".to_string()],
        };
        let message = error.user_message();
        assert!(message.contains("NOT_A_COLUMN"));
        assert!(message.contains("ALSO_MISSING"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_empty_column_list_message() {
        let error = FitsColsError::EmptyColumnList;
        assert!(error.user_message().contains("No columns requested"));
        assert!(error.suggestion().unwrap().contains("--columns"));
    }

    #[test]
    fn test_io_error_has_no_suggestion() {
        let error = FitsColsError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(error.suggestion().is_none());
    }

}
