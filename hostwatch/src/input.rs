//! Line-oriented command input.
//!
//! ```text
//! q | quit        stop
//! r               refresh now
//! c | m           sort by CPU | memory
//! /text           filter by name ("/" alone clears)
//! k <row>         kill the process on that displayed row
//! K | kill-top    kill the highest CPU consumer
//! kill <pid>      kill by pid
//! ```

use crate::monitor::Command;
use crate::process::SortKey;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Parse one input line. Unknown or malformed input yields `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if let Some(filter) = line.strip_prefix('/') {
        return Some(Command::SetFilter(filter.trim().to_string()));
    }

    let mut parts = line.split_whitespace();
    let word = parts.next()?;
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }

    match (word, arg) {
        ("q" | "quit", None) => Some(Command::Stop),
        ("r", None) => Some(Command::Refresh),
        ("c", None) => Some(Command::SetSort(SortKey::Cpu)),
        ("m", None) => Some(Command::SetSort(SortKey::Memory)),
        ("K" | "kill-top", None) => Some(Command::KillTop),
        ("k", Some(row)) => row.parse().ok().map(Command::KillSelected),
        ("kill", Some(pid)) => pid.parse().ok().map(Command::Kill),
        _ => None,
    }
}

/// Forward parsed stdin lines to the monitor until EOF or until the
/// monitor goes away.
pub fn spawn_stdin_reader(commands: mpsc::Sender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("[input] stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("[input] reading stdin failed: {e}");
                    break;
                }
            };

            let Some(command) = parse_command(&line) else {
                if !line.trim().is_empty() {
                    warn!("[input] unrecognised command {:?}", line.trim());
                }
                continue;
            };
            let stop = command == Command::Stop;
            if commands.send(command).await.is_err() || stop {
                break;
            }
        }
    })
}
