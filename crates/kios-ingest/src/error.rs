//! Ingest error types.
//!
//! Every variant here is fatal for the whole upload (the file could not be
//! read at all). Bad individual rows are NOT errors at this layer; they come
//! back as raw rows with empty fields and are judged downstream.

use thiserror::Error;

/// Errors raised while reading an uploaded sales file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension is neither CSV nor Excel.
    #[error("unsupported file format: {file_name}")]
    UnsupportedFormat { file_name: String },

    /// The Excel workbook contains no worksheets.
    #[error("no worksheet found in Excel file")]
    NoWorksheet,

    /// CSV-level read failure (malformed quoting, bad UTF-8).
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook-level read failure (corrupt archive, bad sheet data).
    #[error("Excel parse error: {0}")]
    Xlsx(#[from] calamine::Error),
}

/// Convenience type alias for Results with IngestError.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_message_names_file() {
        let err = IngestError::UnsupportedFormat {
            file_name: "penjualan.pdf".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported file format: penjualan.pdf");
    }
}
