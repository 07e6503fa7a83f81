//! Error types for WorkTalk Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Media library permission denied")]
    PermissionDenied,

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Failed to create chat: {0}")]
    ChatCreation(String),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Unknown chat: {0}")]
    UnknownChat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(e.to_string())
    }
}
