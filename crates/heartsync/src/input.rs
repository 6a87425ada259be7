//! Intensity input from stdin
//!
//! A dedicated thread reads lines and forwards them over a channel, so the
//! tick loop only ever does a non-blocking `try_recv`.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io::{self, BufRead};
use std::thread;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Requested workload intensity, not yet clamped
    Intensity(f32),
    /// Line that was neither a number nor a command
    Invalid(String),
    /// `q`, `quit` or `exit`
    Quit,
    /// End of input
    Closed,
}

/// Interpret one line. Blank lines yield nothing.
pub fn parse_line(line: &str) -> Option<InputEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => InputEvent::Quit,
        _ => match line.parse::<f32>() {
            Ok(value) => InputEvent::Intensity(value),
            Err(_) => InputEvent::Invalid(line.to_string()),
        },
    })
}

/// Start the reader thread on stdin.
pub fn spawn_stdin_reader() -> io::Result<Receiver<InputEvent>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("heartsync-stdin".to_string())
        .spawn(move || read_lines(io::stdin().lock(), &tx))?;
    Ok(rx)
}

fn read_lines(reader: impl BufRead, tx: &Sender<InputEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        if let Some(event) = parse_line(&line) {
            // Receiver gone means the consumer has exited
            if tx.send(event).is_err() {
                return;
            }
        }
    }
    let _ = tx.send(InputEvent::Closed);
}
