use anyhow::{Error, Result};
use std::{
    collections::VecDeque,
    io::{self, ErrorKind, Read},
};

use super::terminator::{classify, ClassificationKind};
use crate::core::{
    display::{DisplayHandle, Notification},
    task_manager::Cancellation,
};

// Chunk size for a single read from the link. Bytes past a terminator stay
// queued in `pending` until the next call.
const READ_CHUNK_SIZE: usize = 64;

/// Content collected since the previous terminator, tagged with the
/// terminator that closed it. The terminator byte itself is never part of
/// `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub content: String,
    pub kind: ClassificationKind,
}

impl DecodedMessage {
    pub fn new(content: impl Into<String>, kind: ClassificationKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }

    /// Rejections are always surfaced; other terminators only when they
    /// closed some content (the LF of a CRLF pair yields an empty line).
    pub fn should_display(&self) -> bool {
        !self.content.is_empty() || self.kind.is_warning()
    }
}

/// Result of a single `next_message` call.
#[derive(Debug)]
pub enum ReadOutcome {
    Message(DecodedMessage),
    /// Bytes arrived but no terminator yet. The content is kept for the
    /// next call.
    Pending,
    /// No byte arrived within the read deadline. Retry.
    TimedOut,
    /// The link failed; any partial content has been dropped.
    Fault(io::Error),
}

/// Turns the inbound side of the serial link into decoded messages.
pub struct FrameReader<R> {
    source: R,
    display: DisplayHandle,
    content: Vec<u8>,
    pending: VecDeque<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R, display: DisplayHandle) -> Self {
        Self {
            source,
            display,
            content: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Return the next buffered message, or perform a single read.
    ///
    /// Every call reads from the link at most once, so callers get control
    /// back between read attempts even while an unterminated message keeps
    /// streaming in. Neither `Pending` nor `TimedOut` drops collected
    /// content, so a message that trickles in slower than the read deadline
    /// is still delivered whole. NAK and ENQ terminators push their warning
    /// to the display before the message is returned.
    pub fn next_message(&mut self) -> ReadOutcome {
        if let Some(message) = self.take_buffered() {
            return ReadOutcome::Message(message);
        }

        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => {
                    return self.fault(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "serial link closed",
                    ));
                }
                Ok(n) => {
                    self.pending.extend(&buf[..n]);
                    return match self.take_buffered() {
                        Some(message) => ReadOutcome::Message(message),
                        None => ReadOutcome::Pending,
                    };
                }
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return ReadOutcome::TimedOut;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return self.fault(err),
            }
        }
    }

    fn take_buffered(&mut self) -> Option<DecodedMessage> {
        while let Some(byte) = self.pending.pop_front() {
            match classify(byte) {
                Some(kind) => return Some(self.finish(kind)),
                None => self.content.push(byte),
            }
        }
        None
    }

    fn finish(&mut self, kind: ClassificationKind) -> DecodedMessage {
        // One char per byte, the peripheral speaks plain 8-bit text
        let content: String = self.content.drain(..).map(char::from).collect();
        if let Some(warning) = Notification::warning_for(kind) {
            log::warn!("Peripheral rejected command ({kind}), content: {content:?}");
            self.display.notify(warning);
        }
        DecodedMessage { content, kind }
    }

    fn fault(&mut self, err: io::Error) -> ReadOutcome {
        if !self.content.is_empty() || !self.pending.is_empty() {
            log::debug!(
                "Dropping {} partial byte(s) after read fault",
                self.content.len() + self.pending.len()
            );
        }
        self.content.clear();
        self.pending.clear();
        ReadOutcome::Fault(err)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Drive `reader` until `cancel` is raised or the link faults.
///
/// Cancellation is checked between reads only, so with a read deadline of
/// `d` the loop stops at most `d` after the token is raised.
pub fn run_reader_loop<R: Read>(
    reader: &mut FrameReader<R>,
    cancel: &Cancellation,
    display: &DisplayHandle,
) -> Result<()> {
    loop {
        if cancel.is_cancelled() {
            log::debug!("Frame reader observed cancellation");
            return Ok(());
        }

        match reader.next_message() {
            ReadOutcome::Pending | ReadOutcome::TimedOut => continue,
            ReadOutcome::Message(message) => {
                if message.should_display() {
                    log::debug!("Received [{}] {:?}", message.kind, message.content);
                    display.notify(Notification::Message(message));
                    display.notify(Notification::Prompt);
                } else {
                    log::trace!("Skipping empty {} message", message.kind);
                }
            }
            ReadOutcome::Fault(err) => {
                return Err(Error::new(err).context("Serial read failed"));
            }
        }
    }
}
