//! Query parsing: whitespace-split input lines into [`Command`]s.
//!
//! Tokenization splits on space/tab/newline and discards empty runs —
//! exactly what `str::split_whitespace` already does, so this module
//! calls it directly rather than hand-rolling a character scan.

use seccampdb_core::{Key, Value};

/// One parsed REPL command: `set`, `get`, `del`, `begin`, `commit`,
/// `abort`, `keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `begin`
    Begin,
    /// `set K V`
    Set(Key, Value),
    /// `get K`
    Get(Key),
    /// `del K`
    Del(Key),
    /// `keys`
    Keys,
    /// `commit`
    Commit,
    /// `abort`
    Abort,
}

/// Split `line` into whitespace-separated tokens.
fn words(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Parse one input line into a [`Command`].
pub fn parse_line(line: &str) -> Result<Command, String> {
    let tokens = words(line);
    match tokens.as_slice() {
        ["begin"] => Ok(Command::Begin),
        ["commit"] => Ok(Command::Commit),
        ["abort"] => Ok(Command::Abort),
        ["keys"] => Ok(Command::Keys),
        ["set", k, v] => {
            let key = Key::new(*k).map_err(|e| e.to_string())?;
            let value = v
                .parse::<i64>()
                .map_err(|_| format!("not an integer: {v}"))?;
            Ok(Command::Set(key, Value(value)))
        }
        ["get", k] => Ok(Command::Get(Key::new(*k).map_err(|e| e.to_string())?)),
        ["del", k] => Ok(Command::Del(Key::new(*k).map_err(|e| e.to_string())?)),
        [] => Err("empty command".to_string()),
        other => Err(format!(
            "unrecognized command: {}",
            other.join(" ")
        )),
    }
}
