/************************************************************
 ***************The Alpha File Transfer Protocol*************
 ***********************************************************
 ******commands go out on one socket, the data comes back****
 ***************on another one that *we* listen on***********
 **********************************************************/

use std::env;
use std::io;
use std::process::exit;

use aftp::cmd::{parse_args, Invocation};
use aftp::transfer::{run, SessionReport, TransferOutcome};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn report(r: &SessionReport) {
    match &r.outcome {
        TransferOutcome::Aborted { message } => println!("{}", message),
        TransferOutcome::Closed { records, declared } => {
            eprintln!("Server closed the data connection after {} of {} records", records, declared);
        }
        TransferOutcome::Complete { .. } => {
            if let Some(path) = &r.saved_as {
                println!("Transfer complete: file saved as \"{}\"", path.display());
            }
        }
    }
    if let Some(hex) = &r.digest {
        eprintln!("sha256: {}", hex);
    }
}

fn main() {
    let argv: Vec<String> = env::args().collect();

    let session = match parse_args(argv) {
        Ok(Invocation::Run(s)) => s,
        Ok(Invocation::Help(text)) => { println!("{}", text); exit(0); }
        Err(m) => { eprintln!("{}", m); exit(1); }
    };
    init_logging(session.verbose);

    let stdout = io::stdout();
    let mut display = stdout.lock();
    let result = run(&session, &mut display);
    drop(display);
    match result {
        Ok(r) => report(&r),
        Err(e) if e.is_server_reported() => { println!("{}", e); exit(1); }
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("{}", e);
            exit(1);
        }
    }
}
