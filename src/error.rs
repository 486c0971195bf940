use std::io;

use thiserror::Error;

/// Everything that can go wrong while querying an idTech4 master server.
#[derive(Debug, Error)]
pub enum MasterQueryError {
    #[error("unknown host {0}")]
    Resolution(String, #[source] Option<io::Error>),

    #[error("cannot access the master server: timed out")]
    ConnectTimeout,

    #[error("cannot access the master server")]
    Transport(#[source] io::Error),

    #[error("write timeout")]
    WriteTimeout,

    #[error("write error")]
    Write(#[source] io::Error),

    #[error("read timeout")]
    ReadTimeout,

    #[error("read error")]
    Read(#[source] io::Error),

    #[error("master server has no data to answer with")]
    EmptyResponse,

    #[error("malformed response header")]
    MalformedResponse(#[source] Box<MasterQueryError>),

    #[error("unknown response: {0:?} != \"servers\"")]
    UnexpectedResponseType(String),

    #[error("buffer going too far (pos: {needed}, size: {length})")]
    TruncatedBuffer {
        /// Position the read would have advanced to.
        needed: usize,
        position: usize,
        length: usize,
    },
}

impl MasterQueryError {
    /// Whether this error was caused by one of the exchange's timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            MasterQueryError::ConnectTimeout
                | MasterQueryError::WriteTimeout
                | MasterQueryError::ReadTimeout
        )
    }
}

pub(crate) fn is_timeout_kind(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
