use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to connect to coordinator: {0}")]
    ConnectFault(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to decode session message: {0}")]
    DecodingFault(#[from] serde_json::Error),

    #[error("connection closed by coordinator: {0}")]
    ClosedByPeer(String),

    #[error("received a non-text frame where a session message was expected")]
    UnexpectedFrame,

    #[error("session closed before a reply arrived")]
    Disconnected,
}
