use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::cmd::Session;
use crate::digest::HashingWriter;
use crate::error::{AftpError, Result};
use crate::files::{build_file_writer, save_file_name};
use crate::network::{ControlChannel, DataListener};
use crate::protocol::{count_records, error_record, Mode, ServerResponse, MESSAGE_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Complete { records: u64 },
    // ERROR: record mid-transfer
    Aborted { message: String },
    Closed { records: u64, declared: u64 },
}

#[derive(Debug)]
pub struct SessionReport {
    pub outcome: TransferOutcome,
    pub saved_as: Option<PathBuf>,
    pub digest: Option<String>,
}

enum DrainState {
    AwaitingData { received: u64 },
    Done(TransferOutcome),
}

/// Reads chunks from `peer` into `sink` until `declared` records have been
/// counted, an error record shows up, or the peer closes.
///
/// Chunks are forwarded verbatim and the sink is flushed after each one.
pub fn drain<R: Read, W: Write>(peer: &mut R, sink: &mut W, declared: u64) -> Result<TransferOutcome> {
    let mut buf = [0u8; MESSAGE_LENGTH];
    let mut state = DrainState::AwaitingData { received: 0 };
    loop {
        let received = match &state {
            DrainState::Done(outcome) => return Ok(outcome.clone()),
            DrainState::AwaitingData { received } => *received,
        };
        if received >= declared {
            state = DrainState::Done(TransferOutcome::Complete { records: received });
            continue;
        }

        let n = match peer.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::ConnectionReset => 0,
            Err(e) => return Err(AftpError::from_io(e, "data from the server")),
        };
        if n == 0 {
            warn!("data connection closed after {} of {} records", received, declared);
            state = DrainState::Done(TransferOutcome::Closed { records: received, declared });
            continue;
        }

        let chunk = &buf[..n];
        if let Some(message) = error_record(chunk) {
            debug!("server aborted the transfer: {}", message);
            state = DrainState::Done(TransferOutcome::Aborted { message });
            continue;
        }

        sink.write_all(chunk)?;
        sink.flush()?;
        let records = count_records(chunk);
        debug!("chunk of {} bytes, {} record(s), {}/{}", n, records, received + records, declared);
        state = DrainState::AwaitingData { received: received + records };
    }
}

/// Runs one whole session. The control connection is closed on every path
/// once it has been opened.
pub fn run(session: &Session, display: &mut dyn Write) -> Result<SessionReport> {
    let mut control = ControlChannel::connect(&session.host, session.control_port, session.timeout)?;
    let result = transfer(session, &mut control, display);
    control.close();
    result
}

fn transfer(session: &Session, control: &mut ControlChannel, display: &mut dyn Write) -> Result<SessionReport> {
    control.send_command(&session.mode)?;
    let declared = match control.receive_parsed()? {
        ServerResponse::Error { message } => return Err(AftpError::CommandResponse(message)),
        ServerResponse::Ok { line_count } => line_count,
    };
    info!("server announced {} record(s)", declared);

    // listening before the announcement, so the server can connect right away
    let listener = DataListener::bind(session.data_port)?;
    control.announce_data_port(listener.port())?;
    let mut peer = listener.accept(session.timeout)?;

    let (sink, saved_as): (Box<dyn Write + '_>, Option<PathBuf>) = match &session.mode {
        Mode::List => (Box::new(display), None),
        Mode::Get(name) => {
            let path = save_file_name(name);
            info!("saving to {}", path.display());
            (build_file_writer(&path)?, Some(path))
        }
    };

    let (outcome, digest) = if session.digest {
        let mut hashing = HashingWriter::new(sink);
        let outcome = drain(&mut peer, &mut hashing, declared)?;
        let (_, hex) = hashing.finish();
        (outcome, Some(hex))
    } else {
        let mut sink = sink;
        (drain(&mut peer, &mut sink, declared)?, None)
    };

    Ok(SessionReport { outcome, saved_as, digest })
}
