use crate::DispatchState;
use std::io::ErrorKind;
use thiserror::Error;

/// Concrete errors that occur within weir's HTTP implementation
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// connection was closed
    #[error("Connection closed by peer")]
    Closed,

    /// an attempt was made to mutate a response whose status line and
    /// headers have already been sent
    #[error("Response already committed")]
    Committed,

    /// two writers raced to commit the response and this one lost
    #[error("Concurrent response commit")]
    ConcurrentCommit,

    /// a suspended channel was not resumed within the configured idle
    /// timeout
    #[error("Asynchronous dispatch timed out")]
    Timeout,

    /// a lifecycle operation was invoked from a state that does not
    /// permit it
    #[error("Operation not legal in channel state {0:?}")]
    IllegalState(DispatchState),

    /// the application handler failed
    #[error(transparent)]
    Application(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// We were unable to parse a [`Status`][crate::Status]
    #[error("Invalid status code")]
    InvalidStatus,
}

impl Error {
    /// predicate function to distinguish "the peer went away" failures,
    /// which the channel logs and swallows, from failures that are
    /// surfaced as responses
    pub fn is_closed(&self) -> bool {
        match self {
            Error::Closed => true,
            Error::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }

    /// a short static name for this error kind, used for the request
    /// error attributes
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Closed => "closed",
            Error::Committed => "committed",
            Error::ConcurrentCommit => "concurrent-commit",
            Error::Timeout => "timeout",
            Error::IllegalState(_) => "illegal-state",
            Error::Application(_) => "application",
            Error::InvalidStatus => "invalid-status",
        }
    }
}

/// this crate's result type
pub type Result<T> = std::result::Result<T, Error>;
