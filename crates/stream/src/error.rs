//! Error types for stream operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// A write carried no value. Nodes never deliver "unset" to listeners.
    #[error("sending an unset value to stream `{0}` is not allowed")]
    Unset(String),
}
