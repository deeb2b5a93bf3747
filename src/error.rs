use std::{error::Error as StdError, fmt, io, result::Result as StdResult};

/// Faults at the process boundary.
///
/// These are distinct from refinement failures: a refinement failure is an
/// ordinary [`Failure`](crate::diagnostics::ResultWithDiagnostics::Failure)
/// value travelling back to the caller, while a transport fault means the
/// call itself could not be completed.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The remote side closed the connection mid-call.
    ConnectionClosed,
    /// A frame arrived that does not parse as a protocol message.
    MalformedFrame(String),
    /// The remote side reported a fault executing the call.
    RemoteFault(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed by remote side"),
            Self::MalformedFrame(msg) => write!(f, "malformed frame: {msg}"),
            Self::RemoteFault(msg) => write!(f, "remote fault: {msg}"),
        }
    }
}

impl StdError for TransportError {}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Json(serde_json::Error),
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Transport(e) => Some(e),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub type Result<T> = StdResult<T, Error>;
