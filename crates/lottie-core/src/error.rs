use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("invalid animation document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("composition loading was cancelled")]
    Cancelled,
}
