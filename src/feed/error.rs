use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("stream transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("stream endpoint answered HTTP {0}")]
    Status(u16),
    #[error("stream closed by the server")]
    Closed,
    #[error("malformed article payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid article: {0}")]
    Invalid(&'static str),
}

impl FeedError {
    /// Transport-class failures trigger fallback and reconnection; payload
    /// errors are dropped at the ingestion boundary.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_) | Self::Closed)
    }
}
