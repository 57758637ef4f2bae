use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    #[error("Could not initialize search client: {0}")]
    Initialization(String),
    #[error("Search request failed: {0}")]
    RequestError(String),
    #[error("Search query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not (de)serialize search JSON: {0}")]
    JsonError(String),
}
