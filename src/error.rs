use thiserror::Error;

/// Errors surfaced to the user by the explorer.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// The data source could not be read or lacks required columns.
    /// Fatal for the dataset it concerns; there is nothing to retry.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A column name that is not part of the dataset.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A chart role is unset or bound to a column that cannot serve it.
    #[error("invalid plot request: {0}")]
    InvalidPlotRequest(String),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
