use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepensesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Cannot load data: {0}")]
    DataLoad(String),

    #[error("Format non supporté: {0}")]
    UnsupportedFormat(String),

    #[error("Erreur lors du filtrage : {0}")]
    Filter(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, DepensesError>;
