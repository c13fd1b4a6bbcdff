//! Client engine for AFTP: commands over a control connection, payload over
//! a data connection that the server opens back to us.

pub mod cmd;
pub mod digest;
pub mod error;
pub mod files;
pub mod network;
pub mod protocol;
pub mod transfer;

pub use crate::cmd::{parse_args, Invocation, Session};
pub use crate::error::{AftpError, Result};
pub use crate::protocol::{Mode, ServerResponse};
pub use crate::transfer::{run, SessionReport, TransferOutcome};
