extern crate net2;

use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use net2::TcpBuilder;

use crate::error::{AftpError, Result};
use crate::protocol::{Command, Mode, PortAnnouncement, ServerResponse, Shovable, MESSAGE_LENGTH};

const ACCEPT_POLL: Duration = Duration::from_millis(20);

pub struct ControlChannel {
    stream: TcpStream,
    peer: String,
}

impl ControlChannel {
    /// Connects to `host:port`. Refused, unreachable and timed out are all the
    /// same `Connect` failure.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<ControlChannel> {
        let connect_failed = |source: io::Error| AftpError::Connect {
            host: host.to_string(),
            port,
            source,
        };
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(connect_failed)?
            .collect();

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host resolved to no address");
        for addr in addrs {
            match build_control_stream(addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(timeout)?;
                    debug!("control connection established to {}", addr);
                    return Ok(ControlChannel {
                        stream,
                        peer: format!("{}:{}", host, port),
                    });
                }
                Err(e) => {
                    debug!("connect to {} failed: {}", addr, e);
                    last_err = e;
                }
            }
        }
        Err(connect_failed(last_err))
    }

    pub fn send_command(&mut self, mode: &Mode) -> Result<()> {
        Command { mode }.shove(&mut self.stream)?;
        Ok(())
    }

    pub fn receive_response(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; MESSAGE_LENGTH];
        let n = self
            .stream
            .read(&mut buf)
            .map_err(|e| AftpError::from_io(e, "the server's response"))?;
        debug!("received {:?}", String::from_utf8_lossy(&buf[..n]));
        Ok(buf[..n].to_vec())
    }

    pub fn receive_parsed(&mut self) -> Result<ServerResponse> {
        let raw = self.receive_response()?;
        ServerResponse::from_bytes(&raw)
    }

    /// Tells the server where to connect back. The listener must already be
    /// listening when this is called.
    pub fn announce_data_port(&mut self, port: u16) -> Result<()> {
        PortAnnouncement { port }.shove(&mut self.stream)?;
        Ok(())
    }

    pub fn close(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            // the server may already have hung up
            debug!("shutdown of control connection to {}: {}", self.peer, e);
        }
        debug!("control connection to {} closed", self.peer);
    }
}

fn build_control_stream(addr: SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
    if let Some(t) = timeout {
        return TcpStream::connect_timeout(&addr, t);
    }
    let builder = match addr {
        SocketAddr::V4(_) => TcpBuilder::new_v4()?,
        SocketAddr::V6(_) => TcpBuilder::new_v6()?,
    };
    builder.connect(addr)
}

/// The client side of the reverse data connection: we listen, the server
/// connects.
pub struct DataListener {
    listener: TcpListener,
    port: u16,
}

impl DataListener {
    /// Binds the wildcard address on `port` and listens with a backlog of one.
    pub fn bind(port: u16) -> Result<DataListener> {
        let bind_failed = |source: io::Error| AftpError::Bind { port, source };
        let builder = TcpBuilder::new_v4().map_err(bind_failed)?;
        let builder = builder.bind(("0.0.0.0", port)).map_err(bind_failed)?;
        let listener = builder.listen(1).map_err(bind_failed)?;
        debug!("data listener ready on port {}", port);
        Ok(DataListener { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn accept(self, timeout: Option<Duration>) -> Result<TcpStream> {
        let (peer, addr) = match timeout {
            None => self.listener.accept()?,
            Some(t) => accept_within(&self.listener, t)?,
        };
        peer.set_read_timeout(timeout)?;
        debug!("data connection accepted from {}", addr);
        Ok(peer)
    }
}

fn accept_within(listener: &TcpListener, timeout: Duration) -> Result<(TcpStream, SocketAddr)> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((peer, addr)) => {
                peer.set_nonblocking(false)?;
                return Ok((peer, addr));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    warn!("no data connection within {:?}", timeout);
                    return Err(AftpError::Timeout { what: "the data connection" });
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}
