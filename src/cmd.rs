extern crate getopts;

use std::time::Duration;

use getopts::{Fail, Options};

use crate::error::{AftpError, Result};
use crate::protocol::Mode;

/// One invocation, fixed once the arguments have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub host: String,
    pub control_port: u16,
    pub data_port: u16,
    pub mode: Mode,
    /// Bounds connect, accept and every read. `None` blocks forever.
    pub timeout: Option<Duration>,
    pub digest: bool,
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Invocation {
    Help(String),
    Run(Session),
}

fn build_options() -> Options {
    let mut opts = Options::new();
    opts.optflag("l", "list", "list the server's directory");
    opts.optopt("g", "get", "fetch FILE from the server", "FILE");
    opts.optopt("t", "timeout", "give up on the server after SECS seconds", "SECS");
    opts.optflag("s", "sha256", "print the SHA-256 of the received data");
    opts.optflag("v", "verbose", "log protocol traffic to stderr");
    opts.optflag("h", "help", "print this help");
    opts
}

pub fn usage_line(program: &str) -> String {
    format!(
        "usage: {} <server_host> <server_port> <data_connection_port> <-l | -g> [file_name]",
        program
    )
}

pub fn parse_args(argv: Vec<String>) -> Result<Invocation> {
    let program = argv.first().cloned().unwrap_or_else(|| "aftp".to_string());
    let usage = || AftpError::Usage(usage_line(&program));
    let opts = build_options();

    let matches = match opts.parse(argv.iter().skip(1)) {
        Ok(m) => m,
        Err(Fail::ArgumentMissing(ref opt)) if opt == "g" || opt == "get" => {
            return Err(AftpError::Usage("file name is required with -g command".to_string()));
        }
        Err(_) => return Err(usage()),
    };
    if matches.opt_present("h") {
        return Ok(Invocation::Help(opts.usage(&usage_line(&program))));
    }

    let mode = match (matches.opt_present("l"), matches.opt_str("g")) {
        (true, None) => Mode::List,
        (false, Some(name)) => Mode::Get(name),
        _ => return Err(usage()),
    };

    let (host, control, data) = match matches.free.as_slice() {
        [host, control, data] => (host.clone(), control, data),
        _ => return Err(usage()),
    };
    let control_port = parse_port(control)?;
    let data_port = parse_port(data)?;
    if control_port == data_port {
        return Err(AftpError::Usage(
            "Server port and data port numbers must be different".to_string(),
        ));
    }

    let timeout = match matches.opt_str("t") {
        None => None,
        Some(secs) => match secs.parse::<u64>() {
            Ok(n) if n > 0 => Some(Duration::from_secs(n)),
            _ => return Err(AftpError::Usage(format!("{} is not a valid timeout", secs))),
        },
    };

    Ok(Invocation::Run(Session {
        host,
        control_port,
        data_port,
        mode,
        timeout,
        digest: matches.opt_present("s"),
        verbose: matches.opt_present("v"),
    }))
}

fn parse_port(s: &str) -> Result<u16> {
    match s.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(AftpError::Usage(format!("{} is not a valid port number", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("aftp")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    fn session(line: &str) -> Session {
        match parse_args(args(line)).unwrap() {
            Invocation::Run(s) => s,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn usage_error(line: &str) -> String {
        match parse_args(args(line)) {
            Err(AftpError::Usage(msg)) => msg,
            other => panic!("expected usage error, got {:?}", other),
        }
    }

    #[test]
    fn list_session() {
        let s = session("flip1 30021 30020 -l");
        assert_eq!(s.host, "flip1");
        assert_eq!(s.control_port, 30021);
        assert_eq!(s.data_port, 30020);
        assert_eq!(s.mode, Mode::List);
        assert_eq!(s.timeout, None);
        assert!(!s.digest);
    }

    #[test]
    fn get_session_with_options() {
        let s = session("localhost 21 2121 -g notes.txt -t 5 -s");
        assert_eq!(s.mode, Mode::Get("notes.txt".to_string()));
        assert_eq!(s.timeout, Some(Duration::from_secs(5)));
        assert!(s.digest);
    }

    #[test]
    fn get_needs_a_file_name() {
        assert_eq!(usage_error("h 1 2 -g"), "file name is required with -g command");
    }

    #[test]
    fn shape_errors_print_usage() {
        for line in ["h 1 2", "h 1 2 -l -g f", "h 1 -l", "h 1 2 3 -l", "h 1 2 -x", "h 1 2 -l extra"] {
            assert!(usage_error(line).starts_with("usage: aftp "), "{}", line);
        }
    }

    #[test]
    fn ports_are_validated() {
        assert_eq!(usage_error("h 0 2 -l"), "0 is not a valid port number");
        assert_eq!(usage_error("h 1 65536 -l"), "65536 is not a valid port number");
        assert_eq!(usage_error("h ftp 2 -l"), "ftp is not a valid port number");
    }

    #[test]
    fn equal_ports_are_rejected() {
        assert_eq!(
            usage_error("h 3000 3000 -l"),
            "Server port and data port numbers must be different"
        );
    }

    #[test]
    fn bad_timeout() {
        assert_eq!(usage_error("h 1 2 -l -t 0"), "0 is not a valid timeout");
    }

    #[test]
    fn help() {
        assert!(matches!(parse_args(args("-h")).unwrap(), Invocation::Help(_)));
    }
}
