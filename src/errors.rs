use crate::API_KEY_ENV_VAR;

#[derive(Debug, thiserror::Error)]
pub enum ChainbaseError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlParseError(String),

    #[error("Request errored with status code: {0}")]
    HttpError(reqwest::StatusCode),

    #[error(
        "Missing Chainbase API key; provide one explicitly or set the '{API_KEY_ENV_VAR}' environment variable"
    )]
    MissingApiKey,

    #[error("Chainbase API key is not a valid header value")]
    InvalidApiKey,

    #[error("Chainbase API error: {0}")]
    ApiError(String),

    #[error("Query execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Max retries reached")]
    MaxRetriesReached,

    #[error("Page limit of {0} exceeded while paginating query results")]
    PageLimitExceeded(usize),

    #[error("Row has {actual} values, expected {expected}")]
    RowWidth { expected: usize, actual: usize },

    #[error("Invalid value for column '{column}': {value}")]
    InvalidColumnValue { column: String, value: String },
}

pub type Result<T, E = ChainbaseError> = std::result::Result<T, E>;
