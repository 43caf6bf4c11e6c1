//! Error types for outline sessions

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TocError>;

#[derive(Debug, Error)]
pub enum TocError {
    #[error("Stream error: {0}")]
    Stream(#[from] stream::StreamError),

    #[error("Document error: {0}")]
    Dom(#[from] dom::DomError),

    #[error("Preference error: {0}")]
    Preference(#[from] serde_json::Error),

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Invalid page url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Article is not attached to the document")]
    ArticleDetached,

    #[error("Command panicked: {0}")]
    Panicked(String),
}
