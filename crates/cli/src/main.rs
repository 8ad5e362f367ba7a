//! seccampdb CLI — a minimal REPL driving a single transaction against a
//! `Store`. An external collaborator to the transactional core, kept
//! deliberately small.

mod parse;
mod repl;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use parking_lot::Mutex;

use parse::parse_line;
use repl::Session;
use seccampdb_storage::Store;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (snapshot_path, log_path) = match (args.next(), args.next()) {
        (Some(snapshot), Some(log)) => (PathBuf::from(snapshot), PathBuf::from(log)),
        _ => {
            eprintln!("usage: seccampdb <snapshot-path> <log-path>");
            return ExitCode::FAILURE;
        }
    };

    let store = match Store::new(&snapshot_path, &log_path) {
        Ok(store) => Arc::new(Mutex::new(store)),
        Err(e) => {
            eprintln!("fatal: could not open store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(store);
    let stdin = io::stdin();
    let is_tty = stdin.is_terminal();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if is_tty {
                print_prompt();
            }
            continue;
        }

        match parse_line(trimmed) {
            Ok(command) => session.dispatch(command),
            Err(message) => println!("error: {message}"),
        }

        if is_tty {
            print_prompt();
        }
    }

    session.shutdown();
    ExitCode::SUCCESS
}

fn print_prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
