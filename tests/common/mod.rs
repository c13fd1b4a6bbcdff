#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What the fake server saw on its control connection.
#[derive(Debug)]
pub struct Seen {
    pub command: String,
    pub announce: Option<String>,
}

/// A one-shot AFTP server on loopback. `data` of `None` means it never opens
/// the data connection.
pub fn spawn_server(reply: &'static str, data: Option<Vec<&'static str>>) -> (u16, JoinHandle<Seen>) {
    spawn_server_with(reply, data, false)
}

/// Like [`spawn_server`], but with `stall` set the data connection stays open
/// after the last chunk until the client hangs up the control connection.
pub fn spawn_server_with(
    reply: &'static str,
    data: Option<Vec<&'static str>>,
    stall: bool,
) -> (u16, JoinHandle<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (control, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(control.try_clone().unwrap());

        let mut command = String::new();
        reader.read_line(&mut command).unwrap();
        (&control).write_all(reply.as_bytes()).unwrap();

        let mut announce = String::new();
        if reader.read_line(&mut announce).unwrap() == 0 {
            return Seen { command, announce: None };
        }

        let mut held = None;
        if let Some(chunks) = data {
            let data_port: u16 = announce
                .trim_end()
                .strip_prefix("TRANSFER: ")
                .unwrap()
                .parse()
                .unwrap();
            let mut data_conn = TcpStream::connect(("127.0.0.1", data_port)).unwrap();
            for chunk in chunks {
                if data_conn.write_all(chunk.as_bytes()).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            }
            if stall {
                held = Some(data_conn);
            }
        }

        // hold the control connection until the client closes it
        let mut rest = String::new();
        while reader.read_line(&mut rest).unwrap_or(0) > 0 {}
        drop(held);
        Seen { command, announce: Some(announce) }
    });
    (port, handle)
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}
