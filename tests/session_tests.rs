// End-to-end sessions against an in-memory peripheral

use anyhow::Result;
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use std::{
    io::{self, ErrorKind, Read, Write},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use serial_chat::{
    core::{
        display::{DisplayHandle, Notification},
        link::{Link, LinkWriter},
        session::{ExitReason, Session, SessionReport, SessionState},
    },
    ClassificationKind, DecodedMessage,
};

const WAIT: Duration = Duration::from_secs(5);

/// Outbound side of the fake peripheral: records every byte and answers each
/// complete line through `replies`.
struct PeripheralInput {
    written: Arc<Mutex<Vec<u8>>>,
    line: Vec<u8>,
    replies: Sender<Vec<u8>>,
}

impl PeripheralInput {
    fn answer(line: &[u8]) -> Vec<u8> {
        match line {
            [0x16, b'T', 0x0D] => b"OK\x06".to_vec(),
            [0x16, b'U', 0x0D] => b"OFF\x06".to_vec(),
            [0x16, b'M', 0x0D, query @ ..] => {
                let mut reply = b"RE:".to_vec();
                reply.extend_from_slice(query);
                reply.extend_from_slice(b"\r\n");
                reply
            }
            [b'!', ..] => vec![0x15],
            _ => vec![0x05],
        }
    }
}

impl Write for PeripheralInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().extend_from_slice(buf);
        for &byte in buf {
            if byte == b'\n' {
                let reply = Self::answer(&self.line);
                self.line.clear();
                let _ = self.replies.send(reply);
            } else {
                self.line.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Inbound side: hands out queued replies, timing out like a serial port
/// with a short read deadline.
struct PeripheralOutput {
    replies: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for PeripheralOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.replies.recv_timeout(Duration::from_millis(20)) {
                Ok(reply) => self.pending = reply,
                Err(_) => return Err(io::Error::new(ErrorKind::TimedOut, "no reply")),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct Harness {
    lines: Sender<String>,
    notes: Receiver<Notification>,
    written: Arc<Mutex<Vec<u8>>>,
    state: serial_chat::core::session::StateHandle,
    session: thread::JoinHandle<Result<SessionReport>>,
}

fn start() -> Harness {
    let (display, notes) = DisplayHandle::channel();
    let (lines, line_rx) = flume::unbounded();
    let (reply_tx, reply_rx) = flume::unbounded();
    let written = Arc::new(Mutex::new(Vec::new()));

    let session = Session::new(display);
    let state = session.state();
    let writer = PeripheralInput {
        written: written.clone(),
        line: Vec::new(),
        replies: reply_tx,
    };
    let reader = PeripheralOutput {
        replies: reply_rx,
        pending: Vec::new(),
    };
    let session = thread::spawn(move || {
        session.run(
            move || {
                Ok(Link {
                    description: "mock at 9600 bps".to_string(),
                    reader,
                    writer: LinkWriter::new(writer, b"\n".to_vec()),
                })
            },
            line_rx,
        )
    });

    Harness {
        lines,
        notes,
        written,
        state,
        session,
    }
}

/// Collect notifications up to and including the first peer message.
fn until_message(notes: &Receiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    loop {
        let note = notes.recv_timeout(WAIT).expect("timed out waiting for a message");
        let done = matches!(note, Notification::Message(_));
        seen.push(note);
        if done {
            return seen;
        }
    }
}

fn is_warning(note: &Notification) -> bool {
    matches!(note, Notification::NegativeAck | Notification::Inquiry)
}

#[test]
fn activate_then_bogus_command() {
    let h = start();

    h.lines.send("!activate".to_string()).unwrap();
    let seen = until_message(&h.notes);
    assert_eq!(
        seen.last(),
        Some(&Notification::Message(DecodedMessage::new("OK", ClassificationKind::Acknowledge)))
    );
    assert!(!seen.iter().any(is_warning));

    h.lines.send("!bogus".to_string()).unwrap();
    let seen = until_message(&h.notes);
    assert_eq!(
        seen.last(),
        Some(&Notification::Message(DecodedMessage::new("", ClassificationKind::NegativeAck)))
    );
    assert_eq!(seen.iter().filter(|n| is_warning(n)).count(), 1);
    assert!(seen.contains(&Notification::NegativeAck));

    h.lines.send("!exit".to_string()).unwrap();
    let report = h.session.join().unwrap().unwrap();
    assert_eq!(report.exit, ExitReason::Operator);
    assert_eq!(report.frames_sent, 2);
    assert!(report.is_clean());
    assert_eq!(h.state.get(), SessionState::Closed);
    assert_eq!(h.written.lock().as_slice(), b"\x16T\r\n!bogus\n");
}

#[test]
fn query_and_plain_text() {
    let h = start();

    h.lines.send("?STATUS".to_string()).unwrap();
    let seen = until_message(&h.notes);
    assert_eq!(
        seen.last(),
        Some(&Notification::Message(DecodedMessage::new("RE:STATUS", ClassificationKind::LineEnd)))
    );

    h.lines.send("hello".to_string()).unwrap();
    let seen = until_message(&h.notes);
    assert!(seen.contains(&Notification::Inquiry));
    assert_eq!(
        seen.last(),
        Some(&Notification::Message(DecodedMessage::new("", ClassificationKind::Inquiry)))
    );

    drop(h.lines);
    let report = h.session.join().unwrap().unwrap();
    assert_eq!(report.exit, ExitReason::EndOfInput);
    assert_eq!(h.written.lock().as_slice(), b"\x16M\rSTATUS\nhello\n");
}

#[test]
fn exit_stops_idle_reader_promptly() {
    let h = start();
    // Let the reader sit in a few empty read deadlines first
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    h.lines.send("!exit".to_string()).unwrap();
    let report = h.session.join().unwrap().unwrap();

    assert_eq!(report.exit, ExitReason::Operator);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(h.written.lock().is_empty());
    assert!(!h.notes.try_iter().any(|n| matches!(n, Notification::Message(_)) || is_warning(&n)));
}
