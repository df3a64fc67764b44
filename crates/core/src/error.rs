use thiserror::Error;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {collection}: {message}")]
    Fetch { collection: String, message: String },

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn fetch(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            collection: collection.into(),
            message: message.into(),
        }
    }
}
