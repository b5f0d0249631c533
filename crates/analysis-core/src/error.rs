use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A required statement (income statement or balance sheet) is missing or
    /// empty. Fatal for the whole analysis request; no partial report.
    #[error("Insufficient data: {0}")]
    DataUnavailable(String),

    /// The ticker is unknown or delisted at the data provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Transient fetch or decode failure at the data provider.
    #[error("API error: {0}")]
    ApiError(String),
}
