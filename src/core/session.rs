/// Session orchestration
///
/// A session owns the acquired link for its whole life. It starts the frame
/// reader on its own thread, feeds operator lines through the command
/// translator, and on every exit path raises the cancellation token, joins the
/// reader and only then lets the link halves drop.
use anyhow::{anyhow, Error, Result};
use flume::{Receiver, Selector};
use parking_lot::RwLock;
use std::{
    io::{Read, Write},
    sync::Arc,
};

use super::{
    display::DisplayHandle,
    link::{Link, LinkWriter},
    task_manager::{join_worker, spawn_worker, Cancellation},
};
use crate::protocol::{
    command::{translate, Command},
    reader::{run_reader_loop, FrameReader},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Active) | (Connecting, Closed) | (Active, Closing) | (Closing, Closed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closing => write!(f, "closing"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Why the operator loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `!exit` was entered.
    Operator,
    /// The operator input closed (EOF on stdin).
    EndOfInput,
    /// Writing a frame failed.
    WriteFault,
    /// The frame reader stopped on a link fault.
    ReadFault,
}

/// Outcome of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub exit: ExitReason,
    pub frames_sent: usize,
    /// The link fault that ended the session, if any.
    pub fault: Option<Error>,
}

impl SessionReport {
    pub fn is_clean(&self) -> bool {
        self.fault.is_none()
    }
}

/// Observable state of a running session.
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<RwLock<SessionState>>);

impl StateHandle {
    pub fn get(&self) -> SessionState {
        *self.0.read()
    }

    fn transition(&self, next: SessionState) -> Result<()> {
        let mut state = self.0.write();
        if !state.can_transition_to(next) {
            return Err(anyhow!("Illegal session transition {} -> {}", *state, next));
        }
        log::debug!("Session {} -> {}", *state, next);
        *state = next;
        Ok(())
    }
}

enum Event {
    Line(String),
    InputClosed,
    ReaderStopped,
}

pub struct Session {
    display: DisplayHandle,
    state: StateHandle,
    cancel: Cancellation,
}

impl Session {
    pub fn new(display: DisplayHandle) -> Self {
        Self {
            display,
            state: StateHandle(Arc::new(RwLock::new(SessionState::Connecting))),
            cancel: Cancellation::new(),
        }
    }

    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Acquire the link and run until exit, end of input, or a link fault.
    ///
    /// Returns `Err` only when the link could not be acquired (or a worker
    /// thread could not be managed); link faults during the session are
    /// reported in the `SessionReport`.
    pub fn run<R, W, F>(self, acquire: F, input: Receiver<String>) -> Result<SessionReport>
    where
        R: Read + Send + 'static,
        W: Write,
        F: FnOnce() -> Result<Link<R, W>>,
    {
        let link = match acquire() {
            Ok(link) => link,
            Err(err) => {
                self.display.error(format!("[Connection Error] {err:#}"));
                self.state.transition(SessionState::Closed)?;
                return Err(err);
            }
        };
        self.state.transition(SessionState::Active)?;

        let Link {
            description,
            reader,
            mut writer,
        } = link;
        self.display.info(format!("Connected to {description}."));
        self.display.info("Type messages and press Enter to send.\n");

        // Dropped by the reader thread on its way out; a disconnected
        // `stopped_rx` means the reader is gone.
        let (stopped_tx, stopped_rx) = flume::bounded::<()>(1);
        let reader_cancel = self.cancel.clone();
        let reader_display = self.display.clone();
        let reader_thread = spawn_worker("frame-reader", move || -> Result<()> {
            let _stopped = stopped_tx;
            let mut frames = FrameReader::new(reader, reader_display.clone());
            let result = run_reader_loop(&mut frames, &reader_cancel, &reader_display);
            if let Err(err) = &result {
                log::error!("Frame reader stopped: {err:#}");
                reader_display.error(format!("[Receive Error] {err:#}"));
            }
            result
        })?;

        let (exit, frames_sent, write_fault) = self.operator_loop(&mut writer, &input, &stopped_rx);

        self.state.transition(SessionState::Closing)?;
        if self.cancel.cancel() {
            log::debug!("Cancellation raised ({exit:?})");
        }
        let read_result = join_worker("frame-reader", reader_thread);
        drop(writer);
        self.state.transition(SessionState::Closed)?;

        let fault = match (write_fault, read_result) {
            (Some(err), _) => Some(err),
            (None, Err(err)) => Some(err),
            (None, Ok(())) => None,
        };
        log::info!("Session closed ({exit:?}, {frames_sent} frame(s) sent)");
        Ok(SessionReport {
            exit,
            frames_sent,
            fault,
        })
    }

    fn operator_loop<W: Write>(
        &self,
        writer: &mut LinkWriter<W>,
        input: &Receiver<String>,
        stopped_rx: &Receiver<()>,
    ) -> (ExitReason, usize, Option<Error>) {
        let mut frames_sent = 0;
        loop {
            self.display.prompt();

            let event = Selector::new()
                .recv(input, |line| match line {
                    Ok(line) => Event::Line(line),
                    Err(_) => Event::InputClosed,
                })
                .recv(stopped_rx, |_| Event::ReaderStopped)
                .wait();

            let line = match event {
                Event::Line(line) => line,
                Event::InputClosed => {
                    log::info!("Operator input closed");
                    return (ExitReason::EndOfInput, frames_sent, None);
                }
                Event::ReaderStopped => {
                    return (ExitReason::ReadFault, frames_sent, None);
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match translate(&line) {
                Command::Exit => {
                    self.display.info("Exiting the application...");
                    return (ExitReason::Operator, frames_sent, None);
                }
                Command::Frame(frame) => {
                    if let Err(err) = writer.write_frame(&frame) {
                        log::error!("Write failed: {err}");
                        self.display.error(format!("[Send Error] {err}"));
                        let err = Error::new(err).context("Serial write failed");
                        return (ExitReason::WriteFault, frames_sent, Some(err));
                    }
                    frames_sent += 1;
                    log::debug!("Sent {:02X?}", frame.bytes());
                }
            }
        }
    }
}
