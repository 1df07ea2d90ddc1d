//! Error types for the tabsource library

use thiserror::Error;

/// Result type alias for tabsource operations
pub type Result<T> = std::result::Result<T, DataSourceError>;

/// Main error type for all data-source operations
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// The file extension matches no known format. Raised by the dispatcher
    /// before any I/O is attempted.
    #[error(
        "The file name '{0}' has to end in .csv, .csv.gz, .gz, .xls or .xlsx to be dispatched"
    )]
    UnsupportedExtension(String),

    /// A required spreadsheet engine is not available
    #[error("The {engine} engine is not available: {hint}")]
    EngineUnavailable { engine: String, hint: String },

    /// Invalid sheet name or sheet not found
    #[error("Sheet '{sheet}' not found. Available sheets: {available}")]
    SheetNotFound { sheet: String, available: String },

    /// A writer was constructed without a resolvable field-name list
    #[error("Field names are required: {0}")]
    MissingFieldNames(String),

    /// A value list does not line up with the field-name list
    #[error("Row has {got} values but the field-name list has {expected}")]
    FieldCountMismatch { expected: usize, got: usize },

    /// An empty collection was passed to a bulk save helper
    #[error("{0} has to contain at least one element")]
    EmptyInput(&'static str),

    /// Source and destination paths are the same file
    #[error("Both file paths point to the same file: '{0}'")]
    SamePath(String),

    /// Control signal: the single-row primitive was called past the last row.
    /// The bulk helpers and the iterator catch this; it is not a failure.
    #[error("No more rows to read")]
    EndOfData,

    /// A write was attempted after `close()`
    #[error("The writer for '{0}' is already closed")]
    Closed(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV tokenizer/encoder error wrapper
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Calamine workbook error wrapper
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// rust_xlsxwriter error wrapper
    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl DataSourceError {
    /// True for the end-of-data control signal
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, DataSourceError::EndOfData)
    }
}

impl From<calamine::Error> for DataSourceError {
    fn from(err: calamine::Error) -> Self {
        DataSourceError::Workbook(err.to_string())
    }
}

impl From<calamine::XlsxError> for DataSourceError {
    fn from(err: calamine::XlsxError) -> Self {
        DataSourceError::Workbook(err.to_string())
    }
}

impl From<calamine::XlsError> for DataSourceError {
    fn from(err: calamine::XlsError) -> Self {
        DataSourceError::Workbook(err.to_string())
    }
}
