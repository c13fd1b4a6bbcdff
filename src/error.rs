//! Error taxonomy for an AFTP session.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AftpError>;

/// Every way a session can fail. All of them are terminal for the process.
#[derive(Debug, Error)]
pub enum AftpError {
    /// Bad command line. The message is shown to the user as is.
    #[error("{0}")]
    Usage(String),

    #[error("Could not connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Could not bind to port {port} for data connection")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// `ERROR:` reply to the command, message already stripped of its prefix.
    #[error("{0}")]
    CommandResponse(String),

    /// Reply that is neither an error nor a usable line count.
    #[error("malformed server response: {0:?}")]
    MalformedResponse(String),

    #[error("Could not open {} for writing", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out waiting for {what}")]
    Timeout { what: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AftpError {
    /// Server-reported failures are printed verbatim on stdout, everything
    /// else is a client diagnostic.
    pub fn is_server_reported(&self) -> bool {
        matches!(self, AftpError::CommandResponse(_))
    }

    /// Maps a read/accept failure to `Timeout` when the socket deadline fired.
    pub fn from_io(err: io::Error, what: &'static str) -> AftpError {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => AftpError::Timeout { what },
            _ => AftpError::Io(err),
        }
    }
}
