//! Error types for workq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The queue has been stopped. Terminal for the call that sees it.
    #[error("queue is closed")]
    Closed,

    /// No item is ready for delivery.
    #[error("queue is empty")]
    Empty,

    /// The item is already waiting for delivery.
    #[error("item already queued")]
    AlreadyExists,

    /// A container handle that is stale or belongs to another container.
    #[error("element is not live in this container")]
    NilElement,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient conditions the caller is expected to handle and retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Empty | Error::AlreadyExists)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
