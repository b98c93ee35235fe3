use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to generate message id: {0}")]
    MessageId(#[from] rand::Error),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid frame `{0}`")]
    InvalidFrame(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Connect reset by peer")]
    ConnectionReset,
}
