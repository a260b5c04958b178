use anyhow::Result;
use flume::Receiver;
use std::{
    borrow::Cow,
    io::{BufRead, BufReader, ErrorKind},
};

use crate::core::task_manager::spawn_worker;

/// Forward operator lines from `input` into a channel.
///
/// Lines that are not valid UTF-8 are forwarded with the bad bytes replaced
/// and a warning logged. The channel disconnects when `input` reaches EOF or
/// fails. The thread is not joined: a blocking read on stdin cannot be
/// interrupted, and the thread owns nothing but the input handle.
pub fn spawn_line_source<I>(mut input: I) -> Result<Receiver<String>>
where
    I: BufRead + Send + 'static,
{
    let (tx, rx) = flume::unbounded();
    spawn_worker("console-input", move || {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(decode_line(&buf)).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!("Console input failed: {err}");
                    break;
                }
            }
        }
    })?;
    Ok(rx)
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match String::from_utf8_lossy(line) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            log::warn!("Console input is not valid UTF-8, replaced: {text:?}");
            text
        }
    }
}

/// Operator lines from the process's stdin.
pub fn stdin_lines() -> Result<Receiver<String>> {
    spawn_line_source(BufReader::new(std::io::stdin()))
}
