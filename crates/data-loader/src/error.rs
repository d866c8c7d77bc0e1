//! Error types for the data-loader crate.
//!
//! Only problems that make the whole dataset unusable are errors. A bad value
//! inside a single row is a data-quality issue: the field falls back to
//! empty/absent and the row keeps going (see [`crate::LoadReport`]).

use thiserror::Error;

/// Errors that can occur while opening or decoding a dataset
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV layer could not read the header or the stream itself
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A column the loader cannot work without is absent from the header
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A value outside its allowed set (e.g. an unknown quality tier)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// The dataset decoded fine but contained no usable rows
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
