use std::io::Write;

use log::debug;

use crate::error::{AftpError, Result};

pub const MESSAGE_LENGTH: usize = 1024; // every socket read is capped at this

pub const CONTROL_PREFIX: &str  = "CONTROL: ";
pub const TRANSFER_PREFIX: &str = "TRANSFER: ";
pub const OK_PREFIX: &str       = "OK: ";
pub const ERROR_PREFIX: &str    = "ERROR: ";

pub const LIST_FLAG: &str       = "-l";
pub const GET_FLAG: &str        = "-g";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Get(String),
}

/// `CONTROL: -l` or `CONTROL: -g <file>`.
pub struct Command<'a> {
    pub mode: &'a Mode,
}

/// `TRANSFER: <port>`, sent once the data listener is up.
pub struct PortAnnouncement {
    pub port: u16,
}

pub trait Shovable {
    fn encode(&self) -> String;

    fn shove<W: Write>(&self, stream: &mut W) -> Result<usize> {
        let line = self.encode();
        // write_all retries short writes until the whole line is out
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        debug!("sent {:?}", line);
        Ok(line.len())
    }
}

impl Shovable for Command<'_> {
    fn encode(&self) -> String {
        match self.mode {
            Mode::List => format!("{}{}\n", CONTROL_PREFIX, LIST_FLAG),
            Mode::Get(name) => format!("{}{} {}\n", CONTROL_PREFIX, GET_FLAG, name),
        }
    }
}

impl Shovable for PortAnnouncement {
    fn encode(&self) -> String {
        format!("{}{}\n", TRANSFER_PREFIX, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResponse {
    Ok { line_count: u64 },
    Error { message: String },
}

impl ServerResponse {
    /// Classifies the first reply on the control connection.
    ///
    /// Anything that does not start with `ERROR: ` is a success; its `OK: `
    /// prefix is optional and the rest must be a non-negative integer.
    pub fn parse(raw: &str) -> Result<ServerResponse> {
        if let Some(message) = error_message(raw) {
            return Ok(ServerResponse::Error { message });
        }
        let count = raw.strip_prefix(OK_PREFIX).unwrap_or(raw);
        match count.trim().parse::<u64>() {
            Ok(line_count) => Ok(ServerResponse::Ok { line_count }),
            Err(_) => Err(AftpError::MalformedResponse(raw.to_string())),
        }
    }

    pub fn from_bytes(raw: &[u8]) -> Result<ServerResponse> {
        ServerResponse::parse(&String::from_utf8_lossy(raw))
    }
}

pub fn error_message(raw: &str) -> Option<String> {
    let message = raw.strip_prefix(ERROR_PREFIX)?;
    let message = message.strip_suffix('\n').unwrap_or(message);
    let message = message.strip_suffix('\r').unwrap_or(message);
    Some(message.to_string())
}

pub fn error_record(chunk: &[u8]) -> Option<String> {
    if !chunk.starts_with(ERROR_PREFIX.as_bytes()) {
        return None;
    }
    error_message(&String::from_utf8_lossy(chunk))
}

/// Number of records a chunk stands for: its newline count, or one for a
/// chunk with no newline at all (the unterminated tail of a file).
///
/// A record split across two reads is counted twice.
pub fn count_records(chunk: &[u8]) -> u64 {
    match chunk.iter().filter(|&&b| b == b'\n').count() {
        0 => 1,
        n => n as u64,
    }
}
